//! Miniature expression language used by the colour map and movement nodes.
//!
//! A script is a list of `name = expression` statements over `f64`
//! variables. Source text is compiled once into a [`CompiledForm`] and then
//! evaluated any number of times, from any number of threads, against
//! independent [`Environment`]s.

mod ast;
mod env;
mod eval;
mod lexer;
mod parser;

use std::sync::Arc;

pub use ast::{named_constant, Assignment, BinaryOp, CompiledForm, Expr, Function};
pub use env::Environment;
pub use eval::evaluate;
pub use parser::compile;

/// Problems found while compiling script source. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("line {line}: statement is not an assignment (missing `=`)")]
    MissingAssignment { line: usize },
    #[error("line {line}: `{name}` cannot be assigned to")]
    InvalidTarget { line: usize, name: String },
    #[error("line {line}, column {column}: unexpected character `{found}`")]
    UnexpectedChar {
        line: usize,
        column: usize,
        found: char,
    },
    #[error("line {line}, column {column}: invalid number `{text}`")]
    InvalidNumber {
        line: usize,
        column: usize,
        text: String,
    },
    #[error("line {line}, column {column}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        column: usize,
        expected: &'static str,
        found: String,
    },
    #[error("line {line}: unbalanced parentheses")]
    Unbalanced { line: usize },
    #[error("line {line}: unknown function `{name}`")]
    UnknownFunction { line: usize, name: String },
    #[error("line {line}: assignment has no expression")]
    EmptyExpression { line: usize },
}

impl ScriptError {
    pub fn line(&self) -> usize {
        match self {
            ScriptError::MissingAssignment { line }
            | ScriptError::InvalidTarget { line, .. }
            | ScriptError::UnexpectedChar { line, .. }
            | ScriptError::InvalidNumber { line, .. }
            | ScriptError::UnexpectedToken { line, .. }
            | ScriptError::Unbalanced { line }
            | ScriptError::UnknownFunction { line, .. }
            | ScriptError::EmptyExpression { line } => *line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStatus {
    /// Source matches the compiled form.
    Clean,
    /// Source changed and has not been compiled yet.
    Dirty,
    /// The latest source failed to compile. A previous compiled form, if any,
    /// is still used.
    Errored,
}

/// User-editable script source together with its lazily compiled form.
#[derive(Debug, Clone)]
pub struct Script {
    name: &'static str,
    source: String,
    compiled: Option<Arc<CompiledForm>>,
    dirty: bool,
    last_error: Option<ScriptError>,
}

impl Script {
    /// Creates a script; `name` labels it in diagnostics ("frame", "point", ...).
    pub fn new(name: &'static str, source: impl Into<String>) -> Self {
        Self {
            name,
            source: source.into(),
            compiled: None,
            dirty: true,
            last_error: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Replaces the source text. Returns `false` when the text is unchanged,
    /// in which case the compiled form stays valid.
    pub fn set_source(&mut self, source: impl Into<String>) -> bool {
        let source = source.into();
        if source == self.source {
            return false;
        }
        self.source = source;
        self.dirty = true;
        true
    }

    pub fn status(&self) -> ScriptStatus {
        if self.dirty {
            ScriptStatus::Dirty
        } else if self.last_error.is_some() {
            ScriptStatus::Errored
        } else {
            ScriptStatus::Clean
        }
    }

    pub fn last_error(&self) -> Option<&ScriptError> {
        self.last_error.as_ref()
    }

    /// The compiled form currently in use, without triggering a compile.
    pub fn compiled(&self) -> Option<&Arc<CompiledForm>> {
        self.compiled.as_ref()
    }

    /// Recompiles if the source changed since the last compile and returns
    /// the form to execute.
    ///
    /// A failed compile is logged and recorded; the last good form stays in
    /// use, and `None` is returned only if the script never compiled.
    pub fn ensure_compiled(&mut self) -> Option<Arc<CompiledForm>> {
        if self.dirty {
            self.dirty = false;
            match compile(&self.source) {
                Ok(form) => {
                    let early = form.reads_before_write();
                    if !early.is_empty() {
                        tracing::debug!(
                            script = self.name,
                            variables = ?early,
                            "script reads variables before assigning them; unset ones read as 0"
                        );
                    }
                    tracing::debug!(
                        script = self.name,
                        statements = form.assignments().len(),
                        "compiled script"
                    );
                    self.compiled = Some(Arc::new(form));
                    self.last_error = None;
                }
                Err(err) => {
                    tracing::warn!(
                        script = self.name,
                        error = %err,
                        keeps_previous = self.compiled.is_some(),
                        "script failed to compile"
                    );
                    self.last_error = Some(err);
                }
            }
        }
        self.compiled.clone()
    }

    /// Compiles if needed and evaluates against `env`. A script that has
    /// never compiled is a no-op.
    pub fn run(&mut self, env: &mut Environment) {
        if let Some(form) = self.ensure_compiled() {
            evaluate(&form, env);
        }
    }
}
