//! Script-driven colour remapping through a 3 x 256 lookup table.
//!
//! The level script sees `red`, `green` and `blue` set to the normalised
//! intensity `i / 255` and writes the mapped values back to the same names.
//! The table is only rebuilt when the script or the recompute flag changes,
//! or every frame while recompute is on.

use crate::buffer::{pack_argb, unpack_argb};
use crate::node::{collect_diagnostics, Effect, FrameContext, FrameScripts, ScriptDiagnostic};
use crate::script::{evaluate, CompiledForm, Environment, Script};
use crate::{BlendMode, ColorMapConfig, ImageBuffer};

/// Number of intensity levels per channel.
pub const LEVELS: usize = 256;

/// Per-channel transfer table from input intensity to output intensity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorLookupTable {
    red: [u8; LEVELS],
    green: [u8; LEVELS],
    blue: [u8; LEVELS],
}

impl ColorLookupTable {
    pub fn identity() -> Self {
        let mut ramp = [0u8; LEVELS];
        for (level, slot) in ramp.iter_mut().enumerate() {
            *slot = level as u8;
        }
        Self {
            red: ramp,
            green: ramp,
            blue: ramp,
        }
    }

    /// Runs `level` once per intensity level on a scratch copy of `env`.
    ///
    /// Results are clamped to `[0, 1]` before conversion to bytes. The copy
    /// carries helper variables from one level to the next, but nothing is
    /// written back to `env`.
    pub fn rebuild(level: &CompiledForm, env: &Environment) -> Self {
        let mut scratch = env.clone();
        let mut table = Self {
            red: [0; LEVELS],
            green: [0; LEVELS],
            blue: [0; LEVELS],
        };

        for i in 0..LEVELS {
            let intensity = i as f64 / 255.0;
            scratch.set("red", intensity);
            scratch.set("green", intensity);
            scratch.set("blue", intensity);
            evaluate(level, &mut scratch);
            table.red[i] = to_byte(scratch.get("red"));
            table.green[i] = to_byte(scratch.get("green"));
            table.blue[i] = to_byte(scratch.get("blue"));
        }

        table
    }

    pub fn red(&self) -> &[u8; LEVELS] {
        &self.red
    }

    pub fn green(&self) -> &[u8; LEVELS] {
        &self.green
    }

    pub fn blue(&self) -> &[u8; LEVELS] {
        &self.blue
    }

    /// Looks up each colour channel independently; alpha is kept.
    #[inline]
    pub fn map_pixel(&self, pixel: u32) -> u32 {
        let [a, r, g, b] = unpack_argb(pixel);
        pack_argb(
            a,
            self.red[r as usize],
            self.green[g as usize],
            self.blue[b as usize],
        )
    }

    /// Maps every pixel of `rows` in place, compositing with the original.
    pub fn apply_in_place(&self, rows: &mut [u32], blend: BlendMode) {
        for pixel in rows {
            *pixel = blend.apply(self.map_pixel(*pixel), *pixel);
        }
    }
}

fn to_byte(value: f64) -> u8 {
    // NaN casts to 0.
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Colour map effect node: init/frame/beat scripts plus a level script.
#[derive(Debug, Clone)]
pub struct ColorMapNode {
    scripts: FrameScripts,
    level: Script,
    blend: BlendMode,
    recompute: bool,
    enabled: bool,
    table: Option<ColorLookupTable>,
    table_valid: bool,
}

impl ColorMapNode {
    pub fn new(config: &ColorMapConfig) -> Self {
        Self {
            scripts: FrameScripts::new(&config.scripts),
            level: Script::new("level", config.scripts.pixel.as_str()),
            blend: config.blend,
            recompute: config.recompute,
            enabled: config.enabled,
            table: None,
            table_valid: false,
        }
    }

    pub fn scripts_mut(&mut self) -> &mut FrameScripts {
        &mut self.scripts
    }

    pub fn set_level_script(&mut self, source: impl Into<String>) {
        if self.level.set_source(source) {
            self.table_valid = false;
        }
    }

    pub fn set_recompute(&mut self, recompute: bool) {
        if self.recompute != recompute {
            self.recompute = recompute;
            self.table_valid = false;
        }
    }

    pub fn set_blend(&mut self, blend: BlendMode) {
        self.blend = blend;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn level_script(&self) -> &Script {
        &self.level
    }

    /// The table used by the last rendered frame, if one was built.
    pub fn table(&self) -> Option<&ColorLookupTable> {
        self.table.as_ref()
    }

    pub fn is_table_valid(&self) -> bool {
        self.table_valid
    }

    fn refresh_table(&mut self) {
        if self.table_valid && !self.recompute {
            return;
        }

        self.table = self.level.ensure_compiled().map(|form| {
            tracing::debug!(recompute = self.recompute, "rebuilding colour lookup table");
            ColorLookupTable::rebuild(&form, self.scripts.env())
        });
        self.table_valid = true;
    }
}

impl Effect for ColorMapNode {
    fn name(&self) -> &str {
        "color_map"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn render(&mut self, ctx: &FrameContext<'_>, input: &ImageBuffer) -> ImageBuffer {
        if !self.enabled {
            return input.clone();
        }

        self.scripts
            .begin_frame(input.width(), input.height(), ctx.audio);
        self.refresh_table();

        let mut output = input.clone();
        if let Some(table) = &self.table {
            let blend = self.blend;
            ctx.scheduler.run_rows(
                output.pixels_mut(),
                input.width(),
                ctx.scheduler.threads(),
                |_, rows| table.apply_in_place(rows, blend),
            );
        }

        self.scripts.end_frame(ctx.delta_seconds);
        output
    }

    fn diagnostics(&mut self) -> Vec<ScriptDiagnostic> {
        let [init, frame, beat] = self.scripts.scripts_mut();
        collect_diagnostics([init, frame, beat, &mut self.level])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::compile;
    use crate::{AudioSnapshot, ScriptSet, TileScheduler};

    fn node(level: &str) -> ColorMapNode {
        ColorMapNode::new(&ColorMapConfig {
            scripts: ScriptSet {
                pixel: level.to_string(),
                ..ScriptSet::default()
            },
            ..ColorMapConfig::default()
        })
    }

    #[test]
    fn rebuild_fills_every_level() {
        let form = compile("red = red; green = 1 - green; blue = 0").unwrap();
        let table = ColorLookupTable::rebuild(&form, &Environment::new());

        assert_eq!(table.red().len(), LEVELS);
        assert_eq!(table.green().len(), LEVELS);
        assert_eq!(table.blue().len(), LEVELS);
        assert_eq!(table, {
            let mut expected = ColorLookupTable::identity();
            for i in 0..LEVELS {
                expected.green[i] = 255 - i as u8;
                expected.blue[i] = 0;
            }
            expected
        });
    }

    #[test]
    fn scales_and_clamps_level_128() {
        let form = compile("red=4*red; green=2*green; blue=blue;").unwrap();

        let mut env = Environment::new();
        let level = 128.0 / 255.0;
        env.set("red", level);
        env.set("green", level);
        env.set("blue", level);
        evaluate(&form, &mut env);
        assert!((env.get("red") - 2.008).abs() < 1e-3);
        assert!((env.get("green") - 1.004).abs() < 1e-3);
        assert!((env.get("blue") - 0.502).abs() < 1e-3);

        let table = ColorLookupTable::rebuild(&form, &Environment::new());
        assert_eq!(table.red()[128], 255);
        assert_eq!(table.green()[128], 255);
        assert_eq!(table.blue()[128], 128);
    }

    #[test]
    fn rebuild_does_not_touch_the_node_environment() {
        let form = compile("red = 0; scratch = 1").unwrap();
        let env = Environment::new();
        ColorLookupTable::rebuild(&form, &env);
        assert!(env.is_empty());
    }

    #[test]
    fn maps_pixels_with_blend_and_keeps_alpha() {
        let form = compile("red = 1 - red; green = green; blue = 0").unwrap();
        let table = ColorLookupTable::rebuild(&form, &Environment::new());
        let mut rows = vec![pack_argb(0x80, 10, 20, 30)];

        table.apply_in_place(&mut rows, BlendMode::Replace);
        assert_eq!(rows[0], pack_argb(0x80, 245, 20, 0));

        let mut rows = vec![pack_argb(0xFF, 10, 20, 30)];
        table.apply_in_place(&mut rows, BlendMode::Additive);
        assert_eq!(rows[0], pack_argb(0xFF, 255, 40, 30));
    }

    #[test]
    fn table_is_cached_until_script_or_flag_changes() {
        let scheduler = TileScheduler::with_threads(1).unwrap();
        let audio = AudioSnapshot::silent();
        let ctx = FrameContext::new(&audio, &scheduler);
        let input = ImageBuffer::test_pattern(8, 8);

        let mut node = node("red = 0");
        node.render(&ctx, &input);
        assert!(node.is_table_valid());
        assert_eq!(node.table().unwrap().red()[200], 0);

        node.set_level_script("red = 1");
        assert!(!node.is_table_valid());
        node.render(&ctx, &input);
        assert_eq!(node.table().unwrap().red()[200], 255);

        node.set_recompute(true);
        assert!(!node.is_table_valid());
    }

    #[test]
    fn recompute_follows_frame_variables() {
        let scheduler = TileScheduler::with_threads(1).unwrap();
        let audio = AudioSnapshot::silent();
        let ctx = FrameContext::new(&audio, &scheduler);
        let input = ImageBuffer::test_pattern(4, 4);

        let mut node = node("red = gain");
        node.scripts_mut().set_frame("gain = frame / 2");
        node.set_recompute(true);

        node.render(&ctx, &input);
        assert_eq!(node.table().unwrap().red()[0], 0);
        node.render(&ctx, &input);
        assert_eq!(node.table().unwrap().red()[0], 128);
    }

    #[test]
    fn broken_level_script_leaves_the_image_unchanged() {
        let scheduler = TileScheduler::with_threads(1).unwrap();
        let audio = AudioSnapshot::silent();
        let ctx = FrameContext::new(&audio, &scheduler);
        let input = ImageBuffer::test_pattern(16, 16);

        let mut node = node("red = pow(red)");
        let output = node.render(&ctx, &input);
        assert_eq!(output, input);
        assert!(node.table().is_none());
        assert_eq!(node.diagnostics().len(), 1);
    }

    #[test]
    fn disabled_node_passes_input_through() {
        let scheduler = TileScheduler::with_threads(1).unwrap();
        let audio = AudioSnapshot::silent();
        let ctx = FrameContext::new(&audio, &scheduler);
        let input = ImageBuffer::test_pattern(16, 16);

        let mut node = node("red = 0; green = 0; blue = 0");
        node.set_enabled(false);
        assert_eq!(node.render(&ctx, &input), input);
    }
}
