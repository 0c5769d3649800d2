use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tui_sketchbook",
    version,
    about = "Generative-art sketches rendered live in the terminal"
)]
pub struct Config {
    /// Start sketch, by index or (partial) name.
    #[arg(long, value_name = "NAME_OR_INDEX")]
    pub sketch: Option<String>,

    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    /// Overrides the sketch's own frame rate.
    #[arg(long)]
    pub fps: Option<u32>,

    #[arg(long, value_enum, default_value_t = AudioSource::Mic)]
    pub audio_source: AudioSource,

    /// WAV file played (and analysed) with `--audio-source file`.
    #[arg(long, value_name = "WAV")]
    pub audio_file: Option<PathBuf>,

    /// Start audio right away instead of on the first click or `a`.
    #[arg(long, default_value_t = false)]
    pub audio_autostart: bool,

    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    /// `test`, `off`, an image file, or a directory of images.
    #[arg(long, default_value = "test")]
    pub camera: String,

    #[arg(long, value_name = "IMAGE")]
    pub image_a: Option<PathBuf>,

    #[arg(long, value_name = "IMAGE")]
    pub image_b: Option<PathBuf>,

    /// `key=value` parameter file; defaults to the XDG config location.
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    #[arg(long, value_name = "DIR", default_value = ".")]
    pub record_dir: PathBuf,

    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value_t = 0x5EED_2024)]
    pub seed: u64,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AudioSource {
    Off,
    Mic,
    #[value(alias = "wav")]
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(alias = "ansi", alias = "text")]
    Ascii,
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
}

impl Config {
    /// Resolves the audio source, preferring `file` whenever a WAV was given.
    pub fn effective_audio_source(&self) -> AudioSource {
        match (self.audio_source, &self.audio_file) {
            (AudioSource::Mic, Some(_)) => AudioSource::File,
            (src, _) => src,
        }
    }
}
