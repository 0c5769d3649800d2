use clap::Parser;
use image::{Rgba, RgbaImage};
use std::path::PathBuf;
use tui_sketchbook::audio::{build_feature_track, read_wav_mono, LevelAnalyser, LEVEL_FFT_SIZE};
use tui_sketchbook::camera::{open_source, FrameSource, Sequence};
use tui_sketchbook::color::Rgb;
use tui_sketchbook::config::{AudioSource, Config, RendererMode};
use tui_sketchbook::params::{ParamSet, ParamsError};
use tui_sketchbook::visual::{NeonGrid, Sketch};

fn write_sine_wav(path: &std::path::Path, sr: u32, seconds: f32, amp: f32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: sr,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(path, spec).unwrap();
    let n = (sr as f32 * seconds) as usize;
    for i in 0..n {
        let s = (std::f32::consts::TAU * 440.0 * i as f32 / sr as f32).sin() * amp;
        for _ in 0..channels {
            w.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
    }
    w.finalize().unwrap();
}

// ── Config ──────────────────────────────────────────────────────────────────

#[test]
fn config_defaults_are_stable() {
    let cfg = Config::try_parse_from(["tui_sketchbook"]).expect("parse should succeed");
    assert_eq!(cfg.renderer, RendererMode::HalfBlock);
    assert_eq!(cfg.audio_source, AudioSource::Mic);
    assert_eq!(cfg.camera, "test");
    assert_eq!(cfg.fps, None);
    assert_eq!(cfg.record_dir, PathBuf::from("."));
    assert!(cfg.sync_updates);
    assert!(!cfg.audio_autostart);
    assert_eq!(cfg.effective_audio_source(), AudioSource::Mic);
}

#[test]
fn config_overrides_and_aliases() {
    let cfg = Config::try_parse_from([
        "tui_sketchbook",
        "--sketch",
        "neon",
        "--renderer",
        "hb",
        "--audio-source",
        "wav",
        "--audio-file",
        "loop.wav",
        "--fps",
        "24",
        "--sync-updates",
        "false",
    ])
    .expect("parse should succeed");
    assert_eq!(cfg.sketch.as_deref(), Some("neon"));
    assert_eq!(cfg.renderer, RendererMode::HalfBlock);
    assert_eq!(cfg.audio_source, AudioSource::File);
    assert_eq!(cfg.fps, Some(24));
    assert!(!cfg.sync_updates);
}

#[test]
fn mic_with_audio_file_switches_to_file() {
    let cfg = Config::try_parse_from(["tui_sketchbook", "--audio-file", "a.wav"]).unwrap();
    assert_eq!(cfg.effective_audio_source(), AudioSource::File);
    let off = Config::try_parse_from([
        "tui_sketchbook",
        "--audio-source",
        "off",
        "--audio-file",
        "a.wav",
    ])
    .unwrap();
    assert_eq!(off.effective_audio_source(), AudioSource::Off);
}

// ── Params files ────────────────────────────────────────────────────────────

#[test]
fn params_file_round_trips_per_sketch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("params.txt");

    let mut grid = NeonGrid::new();
    grid.params_mut().set("cols", "9").unwrap();
    grid.params_mut().set("interactive", "false").unwrap();
    grid.params().save_file(&path, "neon-grid").unwrap();

    let other = ParamSet::new().int("cols", 20, 5, 100);
    other.save_file(&path, "flow-field").unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("neon-grid.cols=9"));
    assert!(text.contains("neon-grid.interactive=false"));
    assert!(text.contains("flow-field.cols=20"));
    assert!(!text.contains("resetActiveCells"), "actions are not persisted");

    let mut fresh = NeonGrid::new();
    let applied = fresh.params_mut().load_file(&path, "neon-grid").unwrap();
    assert!(applied >= 2);
    assert_eq!(fresh.params().get_int("cols"), 9);
    assert!(!fresh.params().get_bool("interactive"));
}

#[test]
fn saving_one_sketch_keeps_shared_lines_for_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.txt");
    std::fs::write(&path, "cols=11\n").unwrap();

    let mut grid = NeonGrid::new();
    grid.params_mut().load_file(&path, "neon-grid").unwrap();
    assert_eq!(grid.params().get_int("cols"), 11);
    grid.params_mut().set("cols", "4").unwrap();
    grid.params().save_file(&path, "neon-grid").unwrap();

    let mut flow = ParamSet::new().int("cols", 20, 5, 100);
    flow.load_file(&path, "flow-field").unwrap();
    assert_eq!(flow.get_int("cols"), 11);

    let mut reloaded = NeonGrid::new();
    reloaded.params_mut().load_file(&path, "neon-grid").unwrap();
    assert_eq!(reloaded.params().get_int("cols"), 4);
}

#[test]
fn params_missing_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut grid = NeonGrid::new();
    let applied = grid
        .params_mut()
        .load_file(&dir.path().join("absent.txt"), "neon-grid")
        .unwrap();
    assert_eq!(applied, 0);
}

#[test]
fn params_reject_malformed_lines_with_line_number() {
    let mut set = ParamSet::new()
        .int("cols", 6, 2, 15)
        .color("background", Rgb::new(0, 0, 0));
    let err = set
        .apply_text("# comment\ncols=4\nbroken line\n", "any")
        .expect_err("missing '=' must fail");
    assert_eq!(
        err,
        ParamsError::Parse {
            line: 3,
            message: "expected <key>=<value>".to_string()
        }
    );
    assert!(err.to_string().contains('3'));

    let applied = set.apply_text("cols=99\nunknown=1\nbackground=#ff0040\n", "any").unwrap();
    assert_eq!(applied, 2);
    assert_eq!(set.get_int("cols"), 15, "values clamp to range");
    assert_eq!(set.get_color("background"), Rgb::new(255, 0, 64));
}

// ── Audio ───────────────────────────────────────────────────────────────────

#[test]
fn wav_reader_downmixes_to_mono() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_sine_wav(&path, 8_000, 0.5, 0.5, 2);
    let (sr, samples) = read_wav_mono(&path).unwrap();
    assert_eq!(sr, 8_000);
    assert_eq!(samples.len(), 4_000);
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!(peak > 0.45 && peak <= 0.51);
}

#[test]
fn wav_reader_reports_missing_file() {
    let err = read_wav_mono(std::path::Path::new("/nonexistent/tone.wav")).unwrap_err();
    assert!(format!("{err:#}").contains("tone.wav"));
}

#[test]
fn louder_audio_gives_higher_level() {
    let dir = tempfile::tempdir().unwrap();
    let quiet = dir.path().join("quiet.wav");
    let loud = dir.path().join("loud.wav");
    write_sine_wav(&quiet, 16_000, 1.0, 0.01, 1);
    write_sine_wav(&loud, 16_000, 1.0, 0.8, 1);

    let track = |p: &std::path::Path| {
        let (sr, s) = read_wav_mono(p).unwrap();
        build_feature_track(&s, sr, 10, 10)
    };
    let q = track(&quiet);
    let l = track(&loud);
    assert_eq!(q.len(), 10);
    assert!(l[9].level > q[9].level);
    assert!(l.iter().all(|f| (0.0..=1.0).contains(&f.level)));
}

#[test]
fn level_analyser_exposes_byte_bins() {
    let mut a = LevelAnalyser::new();
    // Quiet enough that the peak bins stay below the 255 ceiling.
    let tone: Vec<f32> = (0..LEVEL_FFT_SIZE)
        .map(|i| 0.01 * (std::f32::consts::TAU * 16.0 * i as f32 / LEVEL_FFT_SIZE as f32).sin())
        .collect();
    for _ in 0..40 {
        a.process(&tone);
    }
    let bytes = a.bytes();
    assert_eq!(bytes.len(), LEVEL_FFT_SIZE / 2);
    let peak = bytes.iter().enumerate().max_by_key(|(_, b)| **b).map(|(i, _)| i);
    assert_eq!(peak, Some(16));
}

// ── Camera ──────────────────────────────────────────────────────────────────

#[test]
fn image_sequence_loops_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    for (name, v) in [("b.png", 200u8), ("a.png", 10u8), ("notes.txt", 0u8)] {
        let path = dir.path().join(name);
        if name.ends_with(".png") {
            RgbaImage::from_pixel(4, 4, Rgba([v, v, v, 255])).save(&path).unwrap();
        } else {
            std::fs::write(&path, "not an image").unwrap();
        }
    }

    let mut seq = Sequence::open(dir.path(), 2.0).unwrap();
    assert_eq!(seq.len(), 2);
    assert_eq!(seq.frame(0.0).map(|f| f.get_pixel(0, 0).0[0]), Some(10));
    assert_eq!(seq.frame(0.5).map(|f| f.get_pixel(0, 0).0[0]), Some(200));
    assert_eq!(seq.frame(1.0).map(|f| f.get_pixel(0, 0).0[0]), Some(10));

    let mut src = open_source(dir.path().to_str().unwrap(), 2.0).unwrap();
    assert!(src.frame(0.0).is_some());
    let mut still = open_source(dir.path().join("b.png").to_str().unwrap(), 2.0).unwrap();
    assert_eq!(still.frame(9.0).map(|f| f.dimensions()), Some((4, 4)));
    assert!(open_source("off", 2.0).unwrap().frame(0.0).is_none());
    assert!(open_source("/nonexistent/cam.png", 2.0).is_err());
}
