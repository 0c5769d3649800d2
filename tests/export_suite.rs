#[allow(dead_code)]
#[path = "../src/bin/export_video.rs"]
mod export_video;

use clap::Parser;
use std::path::{Path, PathBuf};
use tui_sketchbook::audio::{build_feature_track, read_wav_mono};

/// Loud 440 Hz for the first half second, silence for the second.
fn write_half_loud_wav(path: &Path, sr: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..sr {
        let s = if i < sr / 2 {
            (std::f32::consts::TAU * 440.0 * i as f32 / sr as f32).sin() * 0.8
        } else {
            0.0
        };
        w.write_sample((s * i16::MAX as f32) as i16).unwrap();
    }
    w.finalize().unwrap();
}

#[test]
fn parse_args_defaults_are_stable() {
    let args = export_video::Cli::try_parse_from(["export_video"]).expect("parse should succeed");

    assert_eq!(args.sketch, None);
    assert_eq!(args.audio, None);
    assert_eq!(args.out, PathBuf::from("export.mp4"));
    assert_eq!(args.width, 1080);
    assert_eq!(args.height, 1080);
    assert_eq!(args.fps, None);
    assert_eq!(args.duration, None);
    assert_eq!(args.camera, "test");
    assert_eq!(args.params, None);
}

#[test]
fn parse_args_overrides_work() {
    let args = export_video::Cli::try_parse_from([
        "export_video",
        "--sketch",
        "flow",
        "--audio",
        "song.wav",
        "--out",
        "clips/out.mp4",
        "--width",
        "640",
        "--height",
        "360",
        "--fps",
        "30",
        "--duration",
        "12.5",
        "--camera",
        "frames/",
        "--image-a",
        "a.png",
        "--image-b",
        "b.png",
        "--params",
        "params.txt",
        "--seed",
        "7",
    ])
    .expect("parse should succeed");

    assert_eq!(args.sketch.as_deref(), Some("flow"));
    assert_eq!(args.audio, Some(PathBuf::from("song.wav")));
    assert_eq!(args.out, PathBuf::from("clips/out.mp4"));
    assert_eq!(args.width, 640);
    assert_eq!(args.height, 360);
    assert_eq!(args.fps, Some(30));
    assert_eq!(args.duration, Some(12.5));
    assert_eq!(args.camera, "frames/");
    assert_eq!(args.image_a, Some(PathBuf::from("a.png")));
    assert_eq!(args.image_b, Some(PathBuf::from("b.png")));
    assert_eq!(args.params, Some(PathBuf::from("params.txt")));
    assert_eq!(args.seed, 7);
    assert!(export_video::validate_args(&args).is_ok());
}

#[test]
fn parse_rejects_zero_fps() {
    let args = export_video::Cli::try_parse_from(["export_video", "--fps", "0"])
        .expect("parse should succeed");

    let err = export_video::validate_args(&args).expect_err("fps=0 must fail validation");
    assert!(err.to_string().contains("--fps"));
}

#[test]
fn validate_rejects_zero_size() {
    let args = export_video::Cli::try_parse_from(["export_video", "--width", "0"])
        .expect("parse should succeed");
    let err = export_video::validate_args(&args).expect_err("width=0 must fail validation");
    assert!(err.to_string().contains("--width"));

    let args = export_video::Cli::try_parse_from(["export_video", "--height", "0"])
        .expect("parse should succeed");
    let err = export_video::validate_args(&args).expect_err("height=0 must fail validation");
    assert!(err.to_string().contains("--height"));
}

#[test]
fn validate_rejects_non_positive_duration_cap() {
    let args = export_video::Cli::try_parse_from(["export_video", "--duration", "0"])
        .expect("parse should succeed");

    let err = export_video::validate_args(&args).expect_err("duration=0 must fail validation");
    assert!(err.to_string().contains("--duration"));
}

#[test]
fn duration_prefers_sketch_then_audio_then_fallback() {
    let d = export_video::compute_export_duration;
    assert!((d(Some(30.0), Some(12.0), None) - 30.0).abs() < 1e-6);
    assert!((d(None, Some(12.0), None) - 12.0).abs() < 1e-6);
    assert!((d(None, None, None) - export_video::FALLBACK_DURATION_S).abs() < 1e-6);
    assert!((d(Some(0.0), Some(4.0), None) - 4.0).abs() < 1e-6);

    assert!((d(Some(30.0), None, Some(12.25)) - 12.25).abs() < 1e-6);
    assert!((d(None, Some(5.0), Some(10.0)) - 5.0).abs() < 1e-6);
}

#[test]
fn frame_count_is_repeatable_for_fractional_edges() {
    assert_eq!(export_video::compute_frame_count(30.0, 10), 300);
    assert_eq!(export_video::compute_frame_count(0.01, 60), 1);

    let cases = [
        (59.0 / 60.0, 60, 59usize),
        (61.0 / 60.0, 60, 61usize),
        (2.9999, 30, 89usize),
        (10.0 / 24.0, 24, 10usize),
    ];
    for _ in 0..64 {
        for (duration_s, fps, expected) in cases {
            assert_eq!(export_video::compute_frame_count(duration_s, fps), expected);
        }
    }
}

#[test]
fn short_wav_loops_under_a_longer_sketch_export() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("one_second.wav");
    write_half_loud_wav(&wav, 8_000);
    let (sr, samples) = read_wav_mono(&wav).unwrap();
    let audio_s = samples.len() as f32 / sr as f32;
    assert!((audio_s - 1.0).abs() < 1e-6);

    // Flow field loops every 30 s at 10 fps.
    let duration = export_video::compute_export_duration(Some(30.0), Some(audio_s), None);
    let frames = export_video::compute_frame_count(duration, 10);
    assert_eq!(frames, 300);

    // Frames 1-5 hear the loud half, 6-10 the silent half, then the file repeats.
    let track = build_feature_track(&samples, sr, 10, frames);
    assert_eq!(track.len(), 300);
    for lap in [0usize, 10, 20, 150, 280] {
        assert!(
            track[lap + 11].level > track[lap + 10].level,
            "level should rise again at frame {}",
            lap + 11
        );
        assert!(track[lap + 15].level > track[lap + 16].level);
    }

    let mut args = export_video::Cli::try_parse_from([
        "export_video",
        "--sketch",
        "flow-field",
        "--fps",
        "10",
    ])
    .unwrap();
    args.audio = Some(wav.clone());
    let job = export_video::encode_job(&args, 10, frames);
    let argv: Vec<String> = job
        .ffmpeg_args()
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let audio_in = argv
        .iter()
        .position(|a| a == &wav.to_string_lossy())
        .expect("wav input present");
    assert_eq!(&argv[audio_in - 3..audio_in], ["-stream_loop", "-1", "-i"]);
    assert!(!argv.iter().any(|a| a == "-shortest"));
    let t = argv.iter().position(|a| a == "-t").expect("duration flag");
    assert_eq!(argv[t + 1], "30.000000");
}
