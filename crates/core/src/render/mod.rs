use crate::colormap::ColorMapNode;
use crate::movement::MovementNode;
use crate::node::{Effect, FrameContext, ScriptDiagnostic};
use crate::{AudioSnapshot, ImageBuffer, NodeConfig, PresetConfig, TileScheduler};

/// Ordered chain of effects sharing one tile scheduler.
///
/// Each effect reads the previous stage's output and produces a new buffer,
/// so no stage ever mutates the image it was given.
pub struct RenderGraph {
    effects: Vec<Box<dyn Effect>>,
    scheduler: TileScheduler,
}

impl RenderGraph {
    pub fn new(scheduler: TileScheduler) -> Self {
        Self {
            effects: Vec::new(),
            scheduler,
        }
    }

    /// Instantiates every node of `preset` in order.
    pub fn from_preset(preset: &PresetConfig, scheduler: TileScheduler) -> Self {
        let mut graph = Self::new(scheduler);
        for node in &preset.nodes {
            graph.push(build_effect(node));
        }
        tracing::debug!(preset = %preset.name, effects = graph.len(), "render graph built");
        graph
    }

    pub fn push(&mut self, effect: Box<dyn Effect>) {
        self.effects.push(effect);
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn scheduler(&self) -> &TileScheduler {
        &self.scheduler
    }

    /// Runs one frame through every enabled effect and returns the result.
    pub fn render_frame(
        &mut self,
        input: &ImageBuffer,
        audio: &AudioSnapshot,
        delta_seconds: f64,
    ) -> ImageBuffer {
        let ctx = FrameContext::new(audio, &self.scheduler).with_delta(delta_seconds);
        let mut current = input.clone();
        for effect in &mut self.effects {
            if !effect.is_enabled() {
                continue;
            }
            current = effect.render(&ctx, &current);
        }
        current
    }

    /// Compiles every script in the chain, returning failures tagged with the
    /// index and name of the effect that owns them.
    pub fn diagnostics(&mut self) -> Vec<(usize, String, ScriptDiagnostic)> {
        let mut found = Vec::new();
        for (index, effect) in self.effects.iter_mut().enumerate() {
            let name = effect.name().to_string();
            for diagnostic in effect.diagnostics() {
                found.push((index, name.clone(), diagnostic));
            }
        }
        found
    }
}

impl std::fmt::Debug for RenderGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.effects.iter().map(|effect| effect.name()).collect();
        f.debug_struct("RenderGraph")
            .field("effects", &names)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

fn build_effect(config: &NodeConfig) -> Box<dyn Effect> {
    match config {
        NodeConfig::ColorMap(color) => Box::new(ColorMapNode::new(color)),
        NodeConfig::Movement(movement) => Box::new(MovementNode::new(movement)),
    }
}
