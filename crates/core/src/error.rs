use crate::script::ScriptError;

/// Result alias that carries the custom [`VisFxError`] type.
pub type Result<T> = std::result::Result<T, VisFxError>;

/// Common error type for the core crate.
///
/// Script compile failures are normally kept on the owning
/// [`Script`](crate::script::Script) and never reach the render path; the
/// `Script` variant exists for callers that compile explicitly, such as the
/// `check` command of the application crate.
#[derive(Debug, thiserror::Error)]
pub enum VisFxError {
    /// Free-form message for failures that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// Caller supplied data that cannot be processed.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A preset or configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
    /// The worker pool backing the tile scheduler could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl VisFxError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for VisFxError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for VisFxError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
