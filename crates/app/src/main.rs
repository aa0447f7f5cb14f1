use std::f32::consts::TAU;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use visfx_core::{
    AppConfig, AudioSnapshot, ImageBuffer, PresetConfig, RenderGraph, TileScheduler, VisFxError,
    AUDIO_BINS, DEFAULT_FRAME_SECONDS,
};

const DEFAULT_PRESET: &str = r#"{
    "name": "bass swirl",
    "nodes": [
        {
            "type": "movement",
            "edge": "mirror",
            "scripts": {
                "init": "speed = 0.6",
                "frame": "spin = time * speed; zoom = 1 - bass * 0.15",
                "beat": "speed = 0 - speed",
                "pixel": "r = spin * (1 - d) + r; x = d * cos(r) * zoom; y = d * sin(r) * zoom"
            }
        },
        {
            "type": "color_map",
            "recompute": true,
            "blend": "replace",
            "scripts": {
                "frame": "boost = 1 + treble",
                "pixel": "red = red * boost; green = green; blue = blue * (2 - boost)"
            }
        }
    ]
}"#;

fn main() -> visfx_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            config,
            preset,
            frames,
            width,
            height,
            threads,
            output,
        } => {
            let mut app = match config {
                Some(path) => AppConfig::from_path(path)?,
                None => AppConfig {
                    preset: PresetConfig::from_json_str(DEFAULT_PRESET)?,
                    ..AppConfig::default()
                },
            };
            if let Some(path) = preset {
                app.preset = PresetConfig::from_path(path)?;
            }
            let render = &mut app.render;
            render.frames = frames.unwrap_or(render.frames);
            render.width = width.unwrap_or(render.width);
            render.height = height.unwrap_or(render.height);
            render.threads = threads.unwrap_or(render.threads);
            run_render(&app, &output)
        }
        Commands::Check { preset } => run_check(&preset),
    }
}

fn run_render(app: &AppConfig, output: &Path) -> visfx_core::Result<()> {
    let render = &app.render;
    if render.width == 0 || render.height == 0 {
        return Err(VisFxError::InvalidInput("output size must be non-zero"));
    }
    tracing::info!(
        preset = %app.preset.name,
        width = render.width,
        height = render.height,
        frames = render.frames,
        "rendering preset"
    );

    let scheduler = if render.threads == 0 {
        TileScheduler::new()?
    } else {
        TileScheduler::with_threads(render.threads)?
    };
    let mut graph = RenderGraph::from_preset(&app.preset, scheduler);
    for (index, effect, diagnostic) in graph.diagnostics() {
        tracing::warn!(index, effect = %effect, "{diagnostic}");
    }

    let input = ImageBuffer::test_pattern(render.width, render.height);
    let mut frame = input.clone();
    for index in 0..render.frames {
        let audio = synthetic_audio(index);
        frame = graph.render_frame(&input, &audio, DEFAULT_FRAME_SECONDS);
    }

    write_png(&frame, output)?;
    tracing::info!(?output, "wrote final frame");
    Ok(())
}

fn run_check(path: &Path) -> visfx_core::Result<()> {
    let preset = PresetConfig::from_path(path)?;
    let mut graph = RenderGraph::from_preset(&preset, TileScheduler::with_threads(1)?);
    let diagnostics = graph.diagnostics();

    if diagnostics.is_empty() {
        println!("{}: {} effect(s), all scripts compile", path.display(), graph.len());
        return Ok(());
    }

    for (index, effect, diagnostic) in &diagnostics {
        println!("effect #{index} ({effect}): {diagnostic}");
    }
    Err(VisFxError::msg(format!(
        "{} script(s) failed to compile",
        diagnostics.len()
    )))
}

/// Deterministic stand-in for live analysis: a 2 Hz bass pulse with a beat
/// every half second at 60 fps.
fn synthetic_audio(frame: u32) -> AudioSnapshot {
    let t = frame as f32 * DEFAULT_FRAME_SECONDS as f32;
    let pulse = 0.5 + 0.5 * (t * TAU * 2.0).sin();
    let mut audio = AudioSnapshot::with_levels(
        pulse,
        0.5 + 0.5 * (t * TAU * 0.5).sin(),
        0.5 + 0.5 * (t * TAU * 3.0).cos(),
        frame % 30 == 0,
    );
    for (bin, value) in audio.spectrum.iter_mut().enumerate() {
        let falloff = 1.0 - bin as f32 / AUDIO_BINS as f32;
        *value = pulse * falloff;
    }
    for (index, value) in audio.waveform.iter_mut().enumerate() {
        *value = (index as f32 / AUDIO_BINS as f32 * TAU * 4.0 + t).sin() * pulse;
    }
    audio
}

fn write_png(frame: &ImageBuffer, path: &Path) -> visfx_core::Result<()> {
    let image = image::RgbaImage::from_raw(
        frame.width() as u32,
        frame.height() as u32,
        frame.to_rgba_bytes(),
    )
    .ok_or(VisFxError::InvalidInput("frame buffer does not match its size"))?;
    image
        .save(path)
        .map_err(|err| VisFxError::msg(format!("failed to write {}: {err}", path.display())))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Script-driven visualiser effects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a preset over a generated test pattern and save the last frame.
    Render {
        /// JSON application config (render settings and preset).
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// JSON preset; overrides the preset inside `--config`.
        #[arg(short, long)]
        preset: Option<PathBuf>,
        #[arg(long)]
        frames: Option<u32>,
        #[arg(long)]
        width: Option<usize>,
        #[arg(long)]
        height: Option<usize>,
        /// Worker threads; 0 uses every hardware thread.
        #[arg(long)]
        threads: Option<usize>,
        /// Where to write the PNG.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Compile every script in a preset and report errors.
    Check {
        /// Preset file to validate.
        #[arg(short, long)]
        preset: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preset_compiles_cleanly() {
        let preset = PresetConfig::from_json_str(DEFAULT_PRESET).unwrap();
        let mut graph = RenderGraph::from_preset(&preset, TileScheduler::with_threads(1).unwrap());
        assert!(graph.diagnostics().is_empty());
    }

    #[test]
    fn check_takes_the_preset_as_a_flag() {
        let cli = Cli::try_parse_from(["visfx", "check", "--preset", "swirl.json"]).unwrap();
        match cli.command {
            Commands::Check { preset } => assert_eq!(preset, PathBuf::from("swirl.json")),
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["visfx", "check"]).is_err());
    }

    #[test]
    fn synthetic_audio_beats_every_thirty_frames() {
        assert!(synthetic_audio(0).beat);
        assert!(!synthetic_audio(1).beat);
        assert!(synthetic_audio(30).beat);
        assert_eq!(synthetic_audio(7).spectrum.len(), AUDIO_BINS);
    }
}
