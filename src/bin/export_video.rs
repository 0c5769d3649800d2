use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tui_sketchbook::audio::{build_feature_track, read_wav_mono, AudioFeatures};
use tui_sketchbook::camera::open_source;
use tui_sketchbook::logging;
use tui_sketchbook::recorder::{ensure_ffmpeg_available, EncodeJob, Recorder};
use tui_sketchbook::visual::{
    make_sketches, resolve_sketch_index, Sketch, SketchEngine, SketchInputs,
};

const DEFAULT_OUTPUT: &str = "export.mp4";
const DEFAULT_SEED: u64 = 0x5EED_2024;
/// Length used when neither the sketch nor an audio file gives one.
pub(crate) const FALLBACK_DURATION_S: f32 = 10.0;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "export_video",
    version,
    about = "Offline sketch export (optional WAV input -> MP4 output via ffmpeg)"
)]
pub(crate) struct Cli {
    #[arg(long, value_name = "NAME_OR_INDEX")]
    pub(crate) sketch: Option<String>,

    #[arg(long, value_name = "WAV")]
    pub(crate) audio: Option<PathBuf>,

    #[arg(long, value_name = "MP4", default_value = DEFAULT_OUTPUT)]
    pub(crate) out: PathBuf,

    #[arg(long, default_value_t = 1080)]
    pub(crate) width: usize,

    #[arg(long, default_value_t = 1080)]
    pub(crate) height: usize,

    /// Defaults to the sketch's own frame rate.
    #[arg(long)]
    pub(crate) fps: Option<u32>,

    #[arg(long, value_name = "SECONDS")]
    pub(crate) duration: Option<f32>,

    #[arg(long, default_value = "test")]
    pub(crate) camera: String,

    #[arg(long, value_name = "IMAGE")]
    pub(crate) image_a: Option<PathBuf>,

    #[arg(long, value_name = "IMAGE")]
    pub(crate) image_b: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    pub(crate) params: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub(crate) seed: u64,
}

/// Sketch loop length, else the audio length, else the fallback; capped by `--duration`.
pub(crate) fn compute_export_duration(
    sketch_duration_s: Option<f32>,
    audio_duration_s: Option<f32>,
    duration_cap_s: Option<f32>,
) -> f32 {
    let base = sketch_duration_s
        .filter(|d| *d > 0.0)
        .or(audio_duration_s)
        .unwrap_or(FALLBACK_DURATION_S)
        .max(0.0);
    match duration_cap_s {
        Some(cap) => base.min(cap.max(0.0)),
        None => base,
    }
}

pub(crate) fn compute_frame_count(duration_s: f32, fps: u32) -> usize {
    ((duration_s.max(0.0) * fps as f32).floor() as usize).max(1)
}

pub(crate) fn validate_args(args: &Cli) -> Result<()> {
    if args.width == 0 {
        bail!("--width must be >= 1");
    }
    if args.height == 0 {
        bail!("--height must be >= 1");
    }
    if args.fps == Some(0) {
        bail!("--fps must be >= 1");
    }
    if let Some(cap) = args.duration {
        if cap <= 0.0 {
            bail!("--duration must be > 0 seconds");
        }
    }
    Ok(())
}

/// The WAV, when given, loops under the whole clip; `-t` cuts both streams at
/// the last rendered frame.
pub(crate) fn encode_job(args: &Cli, fps: u32, frame_count: usize) -> EncodeJob {
    EncodeJob {
        out: args.out.clone(),
        width: args.width,
        height: args.height,
        fps,
        audio: args.audio.clone(),
        duration_s: Some(frame_count as f32 / fps.max(1) as f32),
    }
}

fn main() -> Result<()> {
    logging::init_stderr();
    let args = Cli::parse();
    run(args)
}

fn run(args: Cli) -> Result<()> {
    validate_args(&args)?;
    ensure_ffmpeg_available()?;

    let audio = match args.audio.as_deref() {
        Some(path) => {
            let (sample_rate_hz, samples) =
                read_wav_mono(path).with_context(|| format!("read wav {}", path.display()))?;
            if samples.is_empty() || sample_rate_hz == 0 {
                bail!("wav had no samples");
            }
            Some((sample_rate_hz, samples))
        }
        None => None,
    };

    let camera = open_source(&args.camera, 30.0)
        .with_context(|| format!("open camera source '{}'", args.camera))?;
    let mut sketches = make_sketches(SketchInputs {
        camera,
        image_a: args.image_a.clone(),
        image_b: args.image_b.clone(),
        seed: args.seed,
    });
    if let Some(path) = args.params.as_deref() {
        for sketch in &mut sketches {
            let name = sketch.name();
            sketch
                .params_mut()
                .load_file(path, name)
                .with_context(|| format!("load params {}", path.display()))?;
        }
    }
    let names: Vec<&str> = sketches.iter().map(|s| s.name()).collect();
    let active = resolve_sketch_index(args.sketch.as_deref(), &names)?;
    let mut engine = SketchEngine::new(sketches, active);
    engine.resize(args.width, args.height, 1.0);

    let settings = engine.active_settings();
    let fps = settings.effective_fps(args.fps);
    let audio_duration_s = audio
        .as_ref()
        .map(|(sr, samples)| samples.len() as f32 / *sr as f32);
    let export_duration_s =
        compute_export_duration(settings.duration, audio_duration_s, args.duration);
    let frame_count = compute_frame_count(export_duration_s, fps);
    let encoded_duration_s = frame_count as f32 / fps as f32;

    let features = match &audio {
        Some((sr, samples)) => build_feature_track(samples, *sr, fps, frame_count),
        None => vec![AudioFeatures::default(); frame_count],
    };

    tracing::info!(
        sketch = engine.active_name(),
        frames = frame_count,
        fps,
        "exporting {}x{}",
        args.width,
        args.height
    );

    let mut recorder = Recorder::start(encode_job(&args, fps, frame_count))?;

    let dt = 1.0 / fps as f32;
    let audio_running = audio.is_some();
    for (frame_idx, feat) in features.iter().copied().enumerate() {
        let t = frame_idx as f32 * dt;
        let view = engine.render(t, dt, feat, audio_running, Some(fps));
        recorder.push_frame(view.pixels)?;
    }
    let out = recorder.finish()?;

    println!(
        "exported {} frames @ {} fps (duration {:.3}s) -> {}",
        frame_count,
        fps,
        encoded_duration_s,
        out.display()
    );
    Ok(())
}
