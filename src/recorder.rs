use anyhow::{anyhow, bail, Context};
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

/// Largest even size that fits; H.264 with yuv420p needs both sides even.
pub fn even_dims(w: usize, h: usize) -> (usize, usize) {
    (w & !1, h & !1)
}

/// `<sketch>-<unix_ms>.mp4`
pub fn recording_file_name(sketch: &str, unix_ms: u128) -> String {
    format!("{sketch}-{unix_ms}.mp4")
}

/// Copies the top-left `out_w x out_h` region of a `w`-wide RGBA buffer.
pub fn crop_rgba(src: &[u8], w: usize, out_w: usize, out_h: usize, out: &mut Vec<u8>) {
    out.clear();
    let stride = w * 4;
    for row in 0..out_h {
        let start = row * stride;
        let Some(line) = src.get(start..start + out_w * 4) else {
            break;
        };
        out.extend_from_slice(line);
    }
}

pub fn ensure_ffmpeg_available() -> anyhow::Result<()> {
    match Command::new("ffmpeg")
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            bail!("ffmpeg not found in PATH (install ffmpeg and retry)")
        }
        Err(err) => Err(anyhow!("failed to run ffmpeg: {err}")),
    }
}

/// Encoder settings for one output file.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub out: PathBuf,
    pub width: usize,
    pub height: usize,
    pub fps: u32,
    /// Looped, muxed as AAC and cut at `duration_s`.
    pub audio: Option<PathBuf>,
    pub duration_s: Option<f32>,
}

impl EncodeJob {
    pub fn ffmpeg_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-video_size",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(format!("{}x{}", self.width, self.height).into());
        args.push("-framerate".into());
        args.push(self.fps.to_string().into());
        args.push("-i".into());
        args.push("-".into());
        if let Some(audio) = &self.audio {
            args.push("-stream_loop".into());
            args.push("-1".into());
            args.push("-i".into());
            args.push(audio.clone().into());
            for a in ["-map", "0:v:0", "-map", "1:a:0"] {
                args.push(a.into());
            }
        }
        for a in ["-c:v", "libx264", "-pix_fmt", "yuv420p"] {
            args.push(a.into());
        }
        if self.audio.is_some() {
            for a in ["-c:a", "aac"] {
                args.push(a.into());
            }
        }
        if let Some(d) = self.duration_s {
            args.push("-t".into());
            args.push(format!("{d:.6}").into());
        }
        args.push("-movflags".into());
        args.push("+faststart".into());
        args.push(self.out.clone().into());
        args
    }
}

/// Raw RGBA frames piped into an ffmpeg child process.
pub struct Recorder {
    child: Child,
    stdin: Option<ChildStdin>,
    out: PathBuf,
    src_w: usize,
    src_h: usize,
    enc_w: usize,
    enc_h: usize,
    frames: u64,
    scratch: Vec<u8>,
}

impl Recorder {
    /// Spawns ffmpeg for frames of `width x height`; odd sizes are cropped to even.
    pub fn start(job: EncodeJob) -> anyhow::Result<Self> {
        let (src_w, src_h) = (job.width, job.height);
        let (enc_w, enc_h) = even_dims(src_w, src_h);
        if enc_w == 0 || enc_h == 0 {
            bail!("frame {}x{} too small to encode", src_w, src_h);
        }
        if let Some(parent) = job.out.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output directory {}", parent.display()))?;
        }
        let job = EncodeJob {
            width: enc_w,
            height: enc_h,
            ..job
        };

        let mut child = Command::new("ffmpeg")
            .args(job.ffmpeg_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawn ffmpeg for output {}", job.out.display()))?;
        let stdin = child
            .stdin
            .take()
            .context("failed to open ffmpeg stdin for rawvideo input")?;

        tracing::info!(
            out = %job.out.display(),
            width = enc_w,
            height = enc_h,
            fps = job.fps,
            "recording started"
        );
        Ok(Self {
            child,
            stdin: Some(stdin),
            out: job.out,
            src_w,
            src_h,
            enc_w,
            enc_h,
            frames: 0,
            scratch: Vec::new(),
        })
    }

    /// Live recording into `dir`, named after the sketch and the current time.
    pub fn start_live(
        dir: &Path,
        sketch: &str,
        width: usize,
        height: usize,
        fps: u32,
    ) -> anyhow::Result<Self> {
        let unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        Self::start(EncodeJob {
            out: dir.join(recording_file_name(sketch, unix_ms)),
            width,
            height,
            fps,
            audio: None,
            duration_s: None,
        })
    }

    pub fn out_path(&self) -> &Path {
        &self.out
    }

    pub fn accepts(&self, width: usize, height: usize) -> bool {
        width == self.src_w && height == self.src_h
    }

    pub fn push_frame(&mut self, pixels: &[u8]) -> anyhow::Result<()> {
        let stdin = self.stdin.as_mut().context("recorder already finished")?;
        if self.enc_w == self.src_w && self.enc_h == self.src_h {
            stdin
                .write_all(&pixels[..(self.enc_w * self.enc_h * 4).min(pixels.len())])
                .context("write frame to ffmpeg stdin")?;
        } else {
            crop_rgba(pixels, self.src_w, self.enc_w, self.enc_h, &mut self.scratch);
            stdin
                .write_all(&self.scratch)
                .context("write frame to ffmpeg stdin")?;
        }
        self.frames += 1;
        Ok(())
    }

    /// Closes the pipe and waits for ffmpeg to finalize the file.
    pub fn finish(mut self) -> anyhow::Result<PathBuf> {
        drop(self.stdin.take());
        let status = self.child.wait().context("wait for ffmpeg")?;
        if !status.success() {
            bail!("ffmpeg exited with status {status}");
        }
        tracing::info!(out = %self.out.display(), frames = self.frames, "recording finished");
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_sizes_round_down() {
        assert_eq!(even_dims(81, 47), (80, 46));
        assert_eq!(even_dims(80, 46), (80, 46));
        assert_eq!(even_dims(1, 1), (0, 0));
    }

    #[test]
    fn crop_keeps_top_left_region() {
        // 3x2 image, pixel value = index
        let src: Vec<u8> = (0..6u8).flat_map(|i| [i, i, i, 255]).collect();
        let mut out = Vec::new();
        crop_rgba(&src, 3, 2, 2, &mut out);
        let firsts: Vec<u8> = out.chunks(4).map(|p| p[0]).collect();
        assert_eq!(firsts, vec![0, 1, 3, 4]);
    }

    #[test]
    fn file_name_format() {
        assert_eq!(
            recording_file_name("neon-grid", 1700000000123),
            "neon-grid-1700000000123.mp4"
        );
    }

    #[test]
    fn args_mux_audio_only_when_given() {
        let mut job = EncodeJob {
            out: PathBuf::from("out.mp4"),
            width: 64,
            height: 32,
            fps: 10,
            audio: None,
            duration_s: Some(3.0),
        };
        let args: Vec<String> = job
            .ffmpeg_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"64x32".to_string()));
        assert!(args.contains(&"+faststart".to_string()));
        assert!(!args.contains(&"aac".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));

        job.audio = Some(PathBuf::from("a.wav"));
        let args: Vec<String> = job
            .ffmpeg_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"aac".to_string()));
        assert!(args.contains(&"1:a:0".to_string()));
        assert!(!args.contains(&"-shortest".to_string()));
    }
}
