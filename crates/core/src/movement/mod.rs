//! Per-pixel coordinate displacement driven by a point script.
//!
//! For every output pixel the point script receives the pixel's position in
//! normalised coordinates (`x`, `y` in `[-1, 1]` around the image centre,
//! plus polar `d` and `r`) and may rewrite `x` and `y`. The rewritten
//! position is mapped back to a source pixel through the edge mode and
//! composited into the output with the blend mode.

use crate::node::{collect_diagnostics, Effect, FrameContext, FrameScripts, ScriptDiagnostic};
use crate::scheduler::RowBand;
use crate::script::{evaluate, CompiledForm, Environment, Script};
use crate::{AudioSnapshot, BlendMode, EdgeMode, ImageBuffer, MovementConfig};

/// Edge and blend policy for one displacement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Displacement {
    pub edge: EdgeMode,
    pub blend: BlendMode,
}

/// Displaces the rows of `band` from `input` into `output_rows`.
///
/// `output_rows` holds exactly the band's rows of the output image and is
/// composited in place. Each pixel evaluates the point script on its own
/// copy of `base_env`, so results do not depend on how rows are banded.
pub fn transform(
    input: &ImageBuffer,
    output_rows: &mut [u32],
    band: RowBand,
    point: &CompiledForm,
    base_env: &Environment,
    audio: &AudioSnapshot,
    settings: Displacement,
) {
    let width = input.width();
    let height = input.height();
    if width == 0 || height == 0 || band.is_empty() {
        return;
    }
    debug_assert!(band.end <= height, "band {band:?} exceeds image height {height}");
    debug_assert_eq!(output_rows.len(), band.len() * width);

    let cx = width as f64 / 2.0;
    let cy = height as f64 / 2.0;

    let mut local = base_env.clone();
    local.set("w", width as f64);
    local.set("h", height as f64);
    local.set_bool("b", audio.beat);
    for name in ["x", "y", "d", "r"] {
        local.set(name, 0.0);
    }

    // Only assigned names can change, so restoring them resets the pixel.
    let written: Vec<(&str, f64)> = point
        .assignments()
        .iter()
        .map(|assignment| (assignment.target.as_str(), local.get(&assignment.target)))
        .collect();
    for &(name, value) in &written {
        local.set(name, value);
    }

    for (row, y) in output_rows.chunks_mut(width).zip(band.rows()) {
        let ny = (y as f64 - cy) / cy;
        for (x, dst) in row.iter_mut().enumerate() {
            let nx = (x as f64 - cx) / cx;

            for &(name, value) in &written {
                local.set(name, value);
            }
            local.set("x", nx);
            local.set("y", ny);
            local.set("d", (nx * nx + ny * ny).sqrt());
            local.set("r", ny.atan2(nx));
            evaluate(point, &mut local);

            let sx = settings.edge.resolve(to_pixel(local.get("x"), cx), width);
            let sy = settings.edge.resolve(to_pixel(local.get("y"), cy), height);
            *dst = settings.blend.apply(input.get(sx, sy), *dst);
        }
    }
}

/// Maps a normalised coordinate back to the nearest pixel index.
#[inline]
fn to_pixel(normalised: f64, center: f64) -> i64 {
    // `as` saturates infinities and maps NaN to 0.
    (center + normalised * center).round() as i64
}

/// Single-band convenience wrapper around [`transform`].
pub fn transform_image(
    input: &ImageBuffer,
    point: &CompiledForm,
    base_env: &Environment,
    audio: &AudioSnapshot,
    settings: Displacement,
) -> ImageBuffer {
    let mut output = input.clone();
    let band = RowBand::new(0, input.height());
    transform(
        input,
        output.pixels_mut(),
        band,
        point,
        base_env,
        audio,
        settings,
    );
    output
}

/// Movement effect node: init/frame/beat scripts plus a point script.
#[derive(Debug, Clone)]
pub struct MovementNode {
    scripts: FrameScripts,
    point: Script,
    settings: Displacement,
    threads: usize,
    enabled: bool,
}

impl MovementNode {
    pub fn new(config: &MovementConfig) -> Self {
        Self {
            scripts: FrameScripts::new(&config.scripts),
            point: Script::new("point", config.scripts.pixel.as_str()),
            settings: Displacement {
                edge: config.edge,
                blend: config.blend,
            },
            threads: config.threads,
            enabled: config.enabled,
        }
    }

    pub fn scripts_mut(&mut self) -> &mut FrameScripts {
        &mut self.scripts
    }

    pub fn set_point_script(&mut self, source: impl Into<String>) {
        self.point.set_source(source);
    }

    pub fn point_script(&self) -> &Script {
        &self.point
    }

    pub fn set_edge(&mut self, edge: EdgeMode) {
        self.settings.edge = edge;
    }

    pub fn set_blend(&mut self, blend: BlendMode) {
        self.settings.blend = blend;
    }

    /// Requested row bands per frame; 0 uses every scheduler thread.
    pub fn set_threads(&mut self, threads: usize) {
        self.threads = threads;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Effect for MovementNode {
    fn name(&self) -> &str {
        "movement"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn render(&mut self, ctx: &FrameContext<'_>, input: &ImageBuffer) -> ImageBuffer {
        if !self.enabled || input.is_empty() {
            return input.clone();
        }

        self.scripts
            .begin_frame(input.width(), input.height(), ctx.audio);

        let mut output = input.clone();
        if let Some(point) = self.point.ensure_compiled() {
            let bands = if self.threads == 0 {
                ctx.scheduler.threads()
            } else {
                self.threads
            };
            let base_env = self.scripts.env();
            let settings = self.settings;
            let audio = ctx.audio;

            ctx.scheduler
                .run_rows(output.pixels_mut(), input.width(), bands, |band, rows| {
                    transform(input, rows, band, &point, base_env, audio, settings)
                });
        }

        self.scripts.end_frame(ctx.delta_seconds);
        output
    }

    fn diagnostics(&mut self) -> Vec<ScriptDiagnostic> {
        let [init, frame, beat] = self.scripts.scripts_mut();
        collect_diagnostics([init, frame, beat, &mut self.point])
    }
}
