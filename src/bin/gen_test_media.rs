use std::f32::consts::TAU;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use hound::{SampleFormat, WavSpec, WavWriter};
use tui_sketchbook::visual::{default_image_a, default_image_b};

#[derive(Parser, Debug)]
#[command(
    name = "gen_test_media",
    about = "Writes a test WAV and the two particle source images"
)]
struct Args {
    #[arg(long, value_name = "DIR", default_value = "assets/test")]
    out_dir: PathBuf,

    #[arg(long, default_value_t = 48_000)]
    sample_rate: u32,

    /// Side length of the generated PNGs.
    #[arg(long, default_value_t = 512)]
    image_size: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create dir {}", args.out_dir.display()))?;

    let sr = args.sample_rate.clamp(8_000, 192_000);
    let wav = args.out_dir.join("pulse_120bpm.wav");
    let samples = make_fixture(sr);
    write_wav(&wav, sr, &samples).with_context(|| format!("write {}", wav.display()))?;
    println!(
        "generated: {} ({:.2}s @ {}Hz)",
        wav.display(),
        samples.len() as f32 / sr as f32,
        sr
    );

    let size = args.image_size.max(8);
    for (name, img) in [
        ("particles_a.png", default_image_a(size)),
        ("particles_b.png", default_image_b(size)),
    ] {
        let path = args.out_dir.join(name);
        img.save(&path)
            .with_context(|| format!("write {}", path.display()))?;
        println!("generated: {}", path.display());
    }
    Ok(())
}

/// Silence, kick-like pulses at 120 BPM, then a rising sweep.
fn make_fixture(sr: u32) -> Vec<f32> {
    let sr_f = sr as f32;
    let mut out = vec![0.0f32; sr as usize];

    for _ in 0..16 {
        let pulse = (0.02 * sr_f) as usize;
        for i in 0..pulse {
            let t = i as f32 / sr_f;
            let env = 1.0 - i as f32 / pulse as f32;
            out.push(((TAU * 70.0 * t).sin() * 0.9 + (TAU * 2200.0 * t).sin() * 0.3) * env);
        }
        out.resize(out.len() + (0.48 * sr_f) as usize, 0.0);
    }

    let sweep = (6.0 * sr_f) as usize;
    let mut phase = 0.0f32;
    for i in 0..sweep {
        let u = i as f32 / sweep as f32;
        let freq = 120.0 * (8_000.0f32 / 120.0).powf(u);
        phase = (phase + TAU * freq / sr_f) % TAU;
        out.push(phase.sin() * 0.6);
    }

    out.resize(out.len() + sr as usize, 0.0);
    out
}

fn write_wav(path: &Path, sr: u32, samples: &[f32]) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}
