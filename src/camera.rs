//! Camera-like frame sources for the glyph sketch.

use anyhow::{bail, Context};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};

pub trait FrameSource {
    fn name(&self) -> &str;
    /// Frame to show at `time` seconds, or `None` when no input is available.
    fn frame(&mut self, time: f32) -> Option<&RgbaImage>;
}

pub struct Off;

impl FrameSource for Off {
    fn name(&self) -> &str {
        "off"
    }

    fn frame(&mut self, _time: f32) -> Option<&RgbaImage> {
        None
    }
}

pub struct Still {
    label: String,
    image: RgbaImage,
}

impl Still {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("open image {}", path.display()))?
            .to_rgba8();
        Ok(Self {
            label: path.display().to_string(),
            image,
        })
    }
}

impl FrameSource for Still {
    fn name(&self) -> &str {
        &self.label
    }

    fn frame(&mut self, _time: f32) -> Option<&RgbaImage> {
        Some(&self.image)
    }
}

/// Images of a directory, in file-name order, looped at `fps`.
pub struct Sequence {
    label: String,
    frames: Vec<RgbaImage>,
    fps: f32,
}

impl Sequence {
    pub fn open(dir: &Path, fps: f32) -> anyhow::Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("read camera directory {}", dir.display()))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| is_image_path(p))
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for p in &paths {
            match image::open(p) {
                Ok(img) => frames.push(img.to_rgba8()),
                Err(err) => tracing::warn!(path = %p.display(), "skipping unreadable frame: {err}"),
            }
        }
        if frames.is_empty() {
            bail!("no readable images in {}", dir.display());
        }
        Ok(Self {
            label: dir.display().to_string(),
            frames,
            fps: if fps.is_finite() && fps > 0.0 { fps } else { 30.0 },
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for Sequence {
    fn name(&self) -> &str {
        &self.label
    }

    fn frame(&mut self, time: f32) -> Option<&RgbaImage> {
        let idx = (time.max(0.0) * self.fps).floor() as usize % self.frames.len();
        self.frames.get(idx)
    }
}

/// Synthetic moving pattern: a drifting gradient with a bright orbiting disc and
/// a dark bar, so both ends of the brightness range show up.
pub struct TestPattern {
    image: RgbaImage,
}

impl Default for TestPattern {
    fn default() -> Self {
        Self::new(160, 120)
    }
}

impl TestPattern {
    pub fn new(w: u32, h: u32) -> Self {
        Self {
            image: RgbaImage::new(w.max(1), h.max(1)),
        }
    }
}

impl FrameSource for TestPattern {
    fn name(&self) -> &str {
        "test"
    }

    fn frame(&mut self, time: f32) -> Option<&RgbaImage> {
        let (w, h) = self.image.dimensions();
        let (wf, hf) = (w as f32, h as f32);
        let cx = wf * (0.5 + 0.3 * (time * 0.7).cos());
        let cy = hf * (0.5 + 0.3 * (time * 0.9).sin());
        let radius = hf * 0.22;
        let bar_x = (time * 0.25).fract() * wf;

        for (x, y, px) in self.image.enumerate_pixels_mut() {
            let (xf, yf) = (x as f32, y as f32);
            let wave = 0.5 + 0.5 * ((xf / wf) * 6.0 + (yf / hf) * 3.0 + time).sin();
            let mut v = 40.0 + wave * 120.0;
            let (dx, dy) = (xf - cx, yf - cy);
            if dx * dx + dy * dy < radius * radius {
                v = 250.0;
            }
            if (xf - bar_x).abs() < wf * 0.04 {
                v = 8.0;
            }
            let v = v.clamp(0.0, 255.0) as u8;
            *px = Rgba([v, v.saturating_sub(20), v.saturating_add(10), 255]);
        }
        Some(&self.image)
    }
}

/// Resolves `--camera`: `off`, `test`, a directory, or an image file.
pub fn open_source(spec: &str, fps: f32) -> anyhow::Result<Box<dyn FrameSource>> {
    match spec.trim() {
        "" | "off" | "none" => Ok(Box::new(Off)),
        "test" => Ok(Box::new(TestPattern::default())),
        other => {
            let path = Path::new(other);
            if path.is_dir() {
                Ok(Box::new(Sequence::open(path, fps)?))
            } else {
                Ok(Box::new(Still::open(path)?))
            }
        }
    }
}

/// Downsamples a frame to `cols` x `rows` with a triangle filter.
pub fn downsample(frame: &RgbaImage, cols: u32, rows: u32) -> RgbaImage {
    imageops::resize(frame, cols.max(1), rows.max(1), FilterType::Triangle)
}

fn is_image_path(p: &Path) -> bool {
    p.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_moves_over_time() {
        let mut src = TestPattern::new(32, 24);
        let a = src.frame(0.0).cloned().expect("frame");
        let b = src.frame(1.5).cloned().expect("frame");
        assert_eq!(a.dimensions(), (32, 24));
        assert_ne!(a, b);
    }

    #[test]
    fn off_yields_nothing() {
        let mut src = open_source("off", 30.0).expect("off");
        assert!(src.frame(0.0).is_none());
    }

    #[test]
    fn downsample_keeps_flat_color() {
        let img = RgbaImage::from_pixel(100, 80, Rgba([90, 120, 30, 255]));
        let small = downsample(&img, 10, 8);
        assert_eq!(small.dimensions(), (10, 8));
        assert_eq!(small.get_pixel(4, 4), &Rgba([90, 120, 30, 255]));
    }
}
