//! Pieces shared by every script-driven effect node.

use std::fmt;

use crate::timeline::{NodeState, DEFAULT_FRAME_SECONDS};
use crate::{AudioSnapshot, Environment, ImageBuffer, Script, ScriptError, ScriptSet, TileScheduler};

/// Everything a node needs from the host for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub audio: &'a AudioSnapshot,
    pub delta_seconds: f64,
    pub scheduler: &'a TileScheduler,
}

impl<'a> FrameContext<'a> {
    pub fn new(audio: &'a AudioSnapshot, scheduler: &'a TileScheduler) -> Self {
        Self {
            audio,
            delta_seconds: DEFAULT_FRAME_SECONDS,
            scheduler,
        }
    }

    pub fn with_delta(mut self, delta_seconds: f64) -> Self {
        self.delta_seconds = delta_seconds;
        self
    }
}

/// An image transform in the render chain.
pub trait Effect {
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool;

    /// Produces this frame's output. The input is never modified; a disabled
    /// node or one without a usable script returns a copy of it.
    fn render(&mut self, ctx: &FrameContext<'_>, input: &ImageBuffer) -> ImageBuffer;

    /// Compiles every script slot and reports the ones that failed.
    fn diagnostics(&mut self) -> Vec<ScriptDiagnostic>;
}

/// A compile failure attributed to a script slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptDiagnostic {
    pub script: &'static str,
    pub error: ScriptError,
}

impl fmt::Display for ScriptDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} script, {}", self.script, self.error)
    }
}

pub(crate) fn collect_diagnostics<'a>(
    scripts: impl IntoIterator<Item = &'a mut Script>,
) -> Vec<ScriptDiagnostic> {
    scripts
        .into_iter()
        .filter_map(|script| {
            script.ensure_compiled();
            script.last_error().map(|error| ScriptDiagnostic {
                script: script.name(),
                error: error.clone(),
            })
        })
        .collect()
}

/// The init/frame/beat scripts of a node, with the environment and state
/// they operate on.
#[derive(Debug, Clone)]
pub struct FrameScripts {
    pub(crate) init: Script,
    pub(crate) frame: Script,
    pub(crate) beat: Script,
    env: Environment,
    state: NodeState,
}

impl FrameScripts {
    pub fn new(scripts: &ScriptSet) -> Self {
        Self {
            init: Script::new("init", scripts.init.as_str()),
            frame: Script::new("frame", scripts.frame.as_str()),
            beat: Script::new("beat", scripts.beat.as_str()),
            env: Environment::new(),
            state: NodeState::default(),
        }
    }

    /// Replacing the init source makes it run again on the next frame.
    pub fn set_init(&mut self, source: impl Into<String>) {
        if self.init.set_source(source) {
            self.state.initialized = false;
        }
    }

    pub fn set_frame(&mut self, source: impl Into<String>) {
        self.frame.set_source(source);
    }

    pub fn set_beat(&mut self, source: impl Into<String>) {
        self.beat.set_source(source);
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    /// Seeds the frame globals, then runs init (once), frame, and beat (on
    /// beat frames only) against the node environment.
    pub fn begin_frame(&mut self, width: usize, height: usize, audio: &AudioSnapshot) {
        self.state.begin_frame(audio.beat);
        self.state.seed(&mut self.env, width, height, audio);

        if !self.state.initialized {
            self.init.run(&mut self.env);
            self.state.initialized = true;
        }
        self.frame.run(&mut self.env);
        if audio.beat {
            self.beat.run(&mut self.env);
        }
    }

    pub fn end_frame(&mut self, delta_seconds: f64) {
        self.state.end_frame(delta_seconds);
    }

    pub(crate) fn scripts_mut(&mut self) -> [&mut Script; 3] {
        [&mut self.init, &mut self.frame, &mut self.beat]
    }
}
