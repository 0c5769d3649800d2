mod flow_field;
mod glyph_cam;
pub mod math;
mod neon_grid;
mod particles;

use crate::audio::AudioFeatures;
use crate::camera::FrameSource;
use crate::canvas::{Canvas, Glyph};
use crate::params::ParamSet;
use anyhow::bail;
use std::path::PathBuf;

pub use flow_field::FlowField;
pub use glyph_cam::{glyph_for_brightness, GlyphCam, GLYPHS};
pub use neon_grid::{cell_hue, rotation_direction, GridLayout, NeonGrid};
pub use particles::{
    default_image_a, default_image_b, ring_positions, Particle, ParticleField, CURSOR_AWAY,
};

/// Frame rate used for pacing and frame counting when a sketch does not set one.
pub const DEFAULT_FPS: u32 = 30;

/// Length of the crossfade between sketches, in seconds.
const CROSSFADE_SECS: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub dimensions: (u32, u32),
    pub fps: Option<u32>,
    /// Loop length in seconds.
    pub duration: Option<f32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dimensions: (1080, 1080),
            fps: None,
            duration: None,
        }
    }
}

impl Settings {
    pub fn effective_fps(&self, fps_override: Option<u32>) -> u32 {
        fps_override.or(self.fps).unwrap_or(DEFAULT_FPS).max(1)
    }

    /// Maps wall-clock seconds to sketch `(time, frame)`, looping when a duration is set.
    pub fn clock(&self, elapsed: f32, fps_override: Option<u32>) -> (f32, u64) {
        let fps = self.effective_fps(fps_override) as f32;
        let elapsed = elapsed.max(0.0);
        let time = match self.duration {
            Some(d) if d > 0.0 => elapsed % d,
            _ => elapsed,
        };
        (time, (time * fps).floor() as u64)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub time: f32,
    pub frame: u64,
    pub audio: AudioFeatures,
    /// False until the audio source has been started.
    pub audio_running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

/// Pointer event in logical canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub x: f32,
    pub y: f32,
}

pub trait Sketch {
    fn name(&self) -> &'static str;
    fn settings(&self) -> Settings;
    fn params(&self) -> &ParamSet;
    fn params_mut(&mut self) -> &mut ParamSet;
    fn render(&mut self, ctx: &RenderCtx, canvas: &mut Canvas);
    fn pointer(&mut self, _ev: PointerEvent) {}
}

/// External inputs the sketches draw from.
pub struct SketchInputs {
    pub camera: Box<dyn FrameSource>,
    pub image_a: Option<PathBuf>,
    pub image_b: Option<PathBuf>,
    pub seed: u64,
}

pub fn make_sketches(inputs: SketchInputs) -> Vec<Box<dyn Sketch>> {
    vec![
        Box::new(FlowField::new(inputs.seed as u32)),
        Box::new(GlyphCam::new(inputs.camera)),
        Box::new(ParticleField::from_paths(
            inputs.image_a.as_deref(),
            inputs.image_b.as_deref(),
            inputs.seed,
        )),
        Box::new(NeonGrid::new()),
    ]
}

/// Picks a sketch by index, exact name, or name substring (case-insensitive).
pub fn resolve_sketch_index(selection: Option<&str>, names: &[&str]) -> anyhow::Result<usize> {
    if names.is_empty() {
        bail!("no sketches available");
    }
    let Some(raw) = selection else {
        return Ok(0);
    };

    if let Ok(idx) = raw.trim().parse::<usize>() {
        if idx < names.len() {
            return Ok(idx);
        }
        bail!(
            "sketch index {} out of range (0..{})",
            idx,
            names.len().saturating_sub(1)
        );
    }

    let needle = raw.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Ok(0);
    }
    if let Some(idx) = names.iter().position(|n| n.to_ascii_lowercase() == needle) {
        return Ok(idx);
    }
    if let Some(idx) = names
        .iter()
        .position(|n| n.to_ascii_lowercase().contains(&needle))
    {
        return Ok(idx);
    }
    bail!("sketch '{}' not found", raw)
}

struct Slot {
    sketch: Box<dyn Sketch>,
    canvas: Canvas,
}

pub struct FrameView<'a> {
    pub pixels: &'a [u8],
    pub glyphs: &'a [Option<Glyph>],
    pub width: usize,
    pub height: usize,
}

/// Owns every sketch with its own persistent canvas and crossfades between them.
pub struct SketchEngine {
    slots: Vec<Slot>,
    active: usize,
    next: Option<usize>,
    transition_t: f32,
    blended: Vec<u8>,
    w: usize,
    h: usize,
}

impl SketchEngine {
    pub fn new(sketches: Vec<Box<dyn Sketch>>, active: usize) -> Self {
        let slots: Vec<Slot> = sketches
            .into_iter()
            .map(|sketch| {
                let (lw, lh) = sketch.settings().dimensions;
                Slot {
                    sketch,
                    canvas: Canvas::new(lw as f32, lh as f32),
                }
            })
            .collect();
        let active = active.min(slots.len().saturating_sub(1));
        Self {
            slots,
            active,
            next: None,
            transition_t: 0.0,
            blended: Vec::new(),
            w: 0,
            h: 0,
        }
    }

    pub fn resize(&mut self, w: usize, h: usize, pixel_aspect: f32) {
        self.w = w;
        self.h = h;
        self.blended.resize(w.saturating_mul(h).saturating_mul(4), 0);
        for slot in &mut self.slots {
            slot.canvas.resize(w, h, pixel_aspect);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.sketch.name()).collect()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_name(&self) -> &'static str {
        self.slots
            .get(self.active)
            .map(|s| s.sketch.name())
            .unwrap_or("<none>")
    }

    pub fn active_settings(&self) -> Settings {
        self.slots
            .get(self.active)
            .map(|s| s.sketch.settings())
            .unwrap_or_default()
    }

    pub fn active_sketch(&self) -> Option<&dyn Sketch> {
        self.slots.get(self.active).map(|s| s.sketch.as_ref())
    }

    pub fn active_sketch_mut(&mut self) -> Option<&mut (dyn Sketch + 'static)> {
        self.slots.get_mut(self.active).map(|s| s.sketch.as_mut())
    }

    pub fn in_transition(&self) -> bool {
        self.next.is_some()
    }

    pub fn next_sketch(&mut self) {
        if self.slots.is_empty() {
            return;
        }
        let from = self.next.unwrap_or(self.active);
        self.start_transition((from + 1) % self.slots.len());
    }

    pub fn prev_sketch(&mut self) {
        if self.slots.is_empty() {
            return;
        }
        let from = self.next.unwrap_or(self.active);
        self.start_transition((from + self.slots.len() - 1) % self.slots.len());
    }

    fn start_transition(&mut self, target: usize) {
        if let Some(pending) = self.next.take() {
            // Finish the running fade immediately so only two sketches ever blend.
            self.active = pending;
        }
        if target == self.active {
            return;
        }
        self.next = Some(target);
        self.transition_t = 0.0;
        tracing::debug!(
            from = self.slots[self.active].sketch.name(),
            to = self.slots[target].sketch.name(),
            "sketch switch"
        );
    }

    /// Maps a pixel-space point to the active sketch's logical coordinates and forwards it.
    pub fn pointer(&mut self, kind: PointerKind, px: f32, py: f32) {
        let target = self.next.unwrap_or(self.active);
        let Some(slot) = self.slots.get_mut(target) else {
            return;
        };
        let (x, y) = slot.canvas.pixel_to_logical(px, py);
        slot.sketch.pointer(PointerEvent { kind, x, y });
    }

    /// Renders the active sketch (and the incoming one during a crossfade).
    pub fn render(
        &mut self,
        elapsed: f32,
        dt: f32,
        audio: AudioFeatures,
        audio_running: bool,
        fps_override: Option<u32>,
    ) -> FrameView<'_> {
        let alpha = self.step_transition(dt);
        if self.slots.is_empty() || self.w == 0 || self.h == 0 {
            return FrameView {
                pixels: &self.blended,
                glyphs: &[],
                width: self.w,
                height: self.h,
            };
        }

        render_slot(&mut self.slots[self.active], elapsed, audio, audio_running, fps_override);
        let Some(next) = self.next else {
            let canvas = &self.slots[self.active].canvas;
            return FrameView {
                pixels: canvas.pixels(),
                glyphs: canvas.glyphs(),
                width: self.w,
                height: self.h,
            };
        };

        render_slot(&mut self.slots[next], elapsed, audio, audio_running, fps_override);
        let a = &self.slots[self.active].canvas;
        let b = &self.slots[next].canvas;
        blend_rgba(a.pixels(), b.pixels(), alpha, &mut self.blended);
        let glyphs = if alpha < 0.5 { a.glyphs() } else { b.glyphs() };
        FrameView {
            pixels: &self.blended,
            glyphs,
            width: self.w,
            height: self.h,
        }
    }

    fn step_transition(&mut self, dt: f32) -> f32 {
        let Some(next) = self.next else {
            return 0.0;
        };
        self.transition_t += dt.max(0.0) / CROSSFADE_SECS;
        if self.transition_t >= 1.0 {
            self.active = next;
            self.next = None;
            self.transition_t = 0.0;
            return 0.0;
        }
        math::ease_quad_out(self.transition_t.clamp(0.0, 1.0))
    }
}

fn render_slot(
    slot: &mut Slot,
    elapsed: f32,
    audio: AudioFeatures,
    audio_running: bool,
    fps_override: Option<u32>,
) {
    let (time, frame) = slot.sketch.settings().clock(elapsed, fps_override);
    let ctx = RenderCtx {
        time,
        frame,
        audio,
        audio_running,
    };
    slot.canvas.reset_state();
    slot.sketch.render(&ctx, &mut slot.canvas);
}

pub fn blend_rgba(a: &[u8], b: &[u8], t: f32, out: &mut [u8]) {
    let t = t.clamp(0.0, 1.0);
    let it = 1.0 - t;
    let n = out.len().min(a.len()).min(b.len());
    for i in (0..n).step_by(4) {
        out[i] = (a[i] as f32 * it + b[i] as f32 * t) as u8;
        out[i + 1] = (a[i + 1] as f32 * it + b[i + 1] as f32 * t) as u8;
        out[i + 2] = (a[i + 2] as f32 * it + b[i + 2] as f32 * t) as u8;
        out[i + 3] = 255;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_loops_over_duration() {
        let s = Settings {
            dimensions: (1080, 1080),
            fps: Some(10),
            duration: Some(30.0),
        };
        let (t, f) = s.clock(31.25, None);
        assert!((t - 1.25).abs() < 1e-4);
        assert_eq!(f, 12);
        let (_, f) = s.clock(1.25, Some(20));
        assert_eq!(f, 25);

        let open = Settings::default();
        let (t, f) = open.clock(100.0, None);
        assert_eq!(t, 100.0);
        assert_eq!(f, 3000);
    }

    #[test]
    fn resolve_by_index_name_and_substring() {
        let names = ["flow-field", "glyph-cam", "particles", "neon-grid"];
        assert_eq!(resolve_sketch_index(None, &names).unwrap(), 0);
        assert_eq!(resolve_sketch_index(Some("2"), &names).unwrap(), 2);
        assert_eq!(resolve_sketch_index(Some("NEON-grid"), &names).unwrap(), 3);
        assert_eq!(resolve_sketch_index(Some("glyph"), &names).unwrap(), 1);
        assert!(resolve_sketch_index(Some("9"), &names).is_err());
        assert!(resolve_sketch_index(Some("nope"), &names).is_err());
    }

    #[test]
    fn blend_midpoint() {
        let a = [0u8, 0, 0, 255];
        let b = [200u8, 100, 50, 255];
        let mut out = [0u8; 4];
        blend_rgba(&a, &b, 0.5, &mut out);
        assert_eq!(out, [100, 50, 25, 255]);
    }
}
