//! Core library for script-driven visualiser effects.
//!
//! Two node types share one small expression language: a colour map that
//! bakes a level script into a per-channel lookup table, and a movement node
//! that runs a point script for every pixel to displace where it samples
//! from. Per-pixel work is split into row bands and run on a worker pool;
//! every band evaluates scripts against its own copy of the node's variables.

pub mod audio;
pub mod buffer;
pub mod colormap;
pub mod composite;
pub mod config;
pub mod error;
pub mod movement;
pub mod node;
pub mod render;
pub mod scheduler;
pub mod script;
pub mod timeline;

pub use audio::{AudioSnapshot, AUDIO_BINS};
pub use buffer::{pack_argb, unpack_argb, ImageBuffer};
pub use colormap::{ColorLookupTable, ColorMapNode};
pub use composite::{BlendMode, EdgeMode};
pub use config::{
    AppConfig, ColorMapConfig, MovementConfig, NodeConfig, PresetConfig, RenderConfig, ScriptSet,
};
pub use error::{Result, VisFxError};
pub use movement::{transform, Displacement, MovementNode};
pub use node::{Effect, FrameContext, FrameScripts, ScriptDiagnostic};
pub use render::RenderGraph;
pub use scheduler::{hardware_parallelism, RowBand, TileScheduler};
pub use script::{compile, evaluate, CompiledForm, Environment, Script, ScriptError, ScriptStatus};
pub use timeline::{NodeState, DEFAULT_FRAME_SECONDS};
