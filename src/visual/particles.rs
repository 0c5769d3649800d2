use super::math::{ease_quad_out, lerp, map_range, Random};
use super::{PointerEvent, PointerKind, RenderCtx, Settings, Sketch};
use crate::canvas::Canvas;
use crate::color::{ColorRamp, Rgb, BLACK};
use crate::params::ParamSet;
use anyhow::Context;
use image::{Rgba, RgbaImage};
use std::f32::consts::TAU;
use std::path::Path;

const NUM_CIRCLES: usize = 28;
const GAP_CIRCLE: f32 = 2.0;
const GAP_DOT: f32 = 2.0;
const FIT_RADIUS: f32 = 12.0;
/// Cursor position meaning "no pointer held".
pub const CURSOR_AWAY: (f32, f32) = (9999.0, 9999.0);

#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub home_x: f32,
    pub home_y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    pub scale: f32,
    pub color: Rgb,
    pub ramp: ColorRamp,
    pub min_dist: f32,
    pub push: f32,
    pub pull: f32,
    pub damp: f32,
}

impl Particle {
    pub fn new(x: f32, y: f32, radius: f32, ramp: ColorRamp, rng: &mut Random) -> Self {
        Self {
            x,
            y,
            home_x: x,
            home_y: y,
            vx: 0.0,
            vy: 0.0,
            radius,
            scale: 1.0,
            color: ramp.at(0.0),
            ramp,
            min_dist: rng.range(100.0, 180.0),
            push: rng.range(0.01, 0.02),
            pull: rng.range(0.002, 0.005),
            damp: rng.range(0.90, 0.95),
        }
    }

    /// Spring toward home plus repulsion from the cursor, then damping.
    pub fn update(&mut self, cursor: (f32, f32)) {
        let dx = self.home_x - self.x;
        let dy = self.home_y - self.y;
        let dist = (dx * dx + dy * dy).sqrt();

        let mut ax = dx * self.pull;
        let mut ay = dy * self.pull;

        self.scale = map_range(dist, 0.0, 200.0, 1.0, 4.0, true);
        self.color = self.ramp.at(map_range(dist, 0.0, 200.0, 0.0, 1.0, true));

        let dx = self.x - cursor.0;
        let dy = self.y - cursor.1;
        let mut dist = (dx * dx + dy * dy).sqrt();
        if dist == 0.0 || !dist.is_finite() {
            dist = 0.0001;
        }

        if dist < self.min_dist {
            let force = (self.min_dist - dist) * self.push;
            ax += dx / dist * force;
            ay += dy / dist * force;
        }

        self.vx = (self.vx + ax) * self.damp;
        self.vy = (self.vy + ay) * self.damp;
        self.x += self.vx;
        self.y += self.vy;
    }
}

/// Concentric ring layout: ring 0 is the center dot, ring `i` fits as many dots as
/// its circumference allows.
pub fn ring_positions(width: f32, height: f32) -> Vec<(f32, f32)> {
    let mut out = Vec::new();
    let mut cir_radius = 0.0f32;
    for i in 0..NUM_CIRCLES {
        let circumference = TAU * cir_radius;
        let num_fit = if i == 0 {
            1
        } else {
            (circumference / (FIT_RADIUS * 2.0 + GAP_DOT)).floor() as usize
        };
        if num_fit > 0 {
            let slice = TAU / num_fit as f32;
            for j in 0..num_fit {
                let theta = slice * j as f32;
                out.push((
                    theta.cos() * cir_radius + width * 0.5,
                    theta.sin() * cir_radius + height * 0.5,
                ));
            }
        }
        cir_radius += FIT_RADIUS * 2.0 + GAP_CIRCLE;
    }
    out
}

/// Pixel at the same normalized position, clamped to the image.
fn sample_at(img: &RgbaImage, u: f32, v: f32) -> Rgb {
    let (w, h) = img.dimensions();
    let ix = ((u * w as f32).floor().max(0.0) as u32).min(w.saturating_sub(1));
    let iy = ((v * h as f32).floor().max(0.0) as u32).min(h.saturating_sub(1));
    let [r, g, b, _] = img.get_pixel(ix, iy).0;
    Rgb::new(r, g, b)
}

/// Procedural stand-in for image A: a bright disc fading into a dark rim.
pub fn default_image_a(size: u32) -> RgbaImage {
    let c = size as f32 * 0.5;
    RgbaImage::from_fn(size, size, |x, y| {
        let d = ((x as f32 - c).hypot(y as f32 - c) / c).min(1.0);
        let t = 1.0 - ease_quad_out(d);
        let v = lerp(20.0, 255.0, t) as u8;
        Rgba([v, (v as f32 * 0.55) as u8, 90, 255])
    })
}

/// Procedural stand-in for image B: diagonal cool gradient.
pub fn default_image_b(size: u32) -> RgbaImage {
    let s = size.max(1) as f32;
    RgbaImage::from_fn(size, size, |x, y| {
        let t = (x as f32 + y as f32) / (2.0 * s);
        Rgba([
            lerp(0.0, 80.0, t) as u8,
            lerp(200.0, 60.0, t) as u8,
            lerp(255.0, 180.0, t) as u8,
            255,
        ])
    })
}

fn load_image(path: &Path) -> anyhow::Result<RgbaImage> {
    Ok(image::open(path)
        .with_context(|| format!("open image {}", path.display()))?
        .to_rgba8())
}

pub struct ParticleField {
    params: ParamSet,
    particles: Vec<Particle>,
    cursor: (f32, f32),
    held: bool,
}

impl ParticleField {
    /// Builds the particles from two images. Either image failing to load leaves
    /// the field empty, so only the background is drawn.
    pub fn from_paths(a: Option<&Path>, b: Option<&Path>, seed: u64) -> Self {
        let images = match (a, b) {
            (None, None) => Some((default_image_a(256), default_image_b(256))),
            (a, b) => {
                let load = |p: Option<&Path>, fallback: fn(u32) -> RgbaImage| match p {
                    Some(p) => load_image(p),
                    None => Ok(fallback(256)),
                };
                match (load(a, default_image_a), load(b, default_image_b)) {
                    (Ok(a), Ok(b)) => Some((a, b)),
                    (Err(err), _) | (_, Err(err)) => {
                        tracing::warn!("particle images unavailable: {err:#}");
                        None
                    }
                }
            }
        };
        match images {
            Some((a, b)) => Self::from_images(&a, &b, seed),
            None => Self::empty(),
        }
    }

    pub fn from_images(a: &RgbaImage, b: &RgbaImage, seed: u64) -> Self {
        let (width, height) = (1080.0f32, 1080.0f32);
        let mut rng = Random::new(seed);
        let particles = ring_positions(width, height)
            .into_iter()
            .map(|(x, y)| {
                let (u, v) = (x / width, y / height);
                let ca = sample_at(a, u, v);
                let cb = sample_at(b, u, v);
                let radius = map_range(ca.r as f32, 0.0, 255.0, 1.0, 12.0, false);
                Particle::new(x, y, radius, ColorRamp::new(ca, cb), &mut rng)
            })
            .collect();
        Self {
            particles,
            ..Self::empty()
        }
    }

    fn empty() -> Self {
        Self {
            params: ParamSet::new().bool("interactive", true),
            particles: Vec::new(),
            cursor: CURSOR_AWAY,
            held: false,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn cursor(&self) -> (f32, f32) {
        self.cursor
    }
}

impl Sketch for ParticleField {
    fn name(&self) -> &'static str {
        "particles"
    }

    fn settings(&self) -> Settings {
        Settings::default()
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn pointer(&mut self, ev: PointerEvent) {
        if !self.params.get_bool("interactive") {
            self.held = false;
            self.cursor = CURSOR_AWAY;
            return;
        }
        match ev.kind {
            PointerKind::Down => {
                self.held = true;
                self.cursor = (ev.x, ev.y);
            }
            PointerKind::Move if self.held => self.cursor = (ev.x, ev.y),
            PointerKind::Move => {}
            PointerKind::Up => {
                self.held = false;
                self.cursor = CURSOR_AWAY;
            }
        }
    }

    fn render(&mut self, _ctx: &RenderCtx, canvas: &mut Canvas) {
        canvas.set_fill(BLACK);
        canvas.fill_rect(0.0, 0.0, canvas.width(), canvas.height());

        let cursor = if self.params.get_bool("interactive") {
            self.cursor
        } else {
            CURSOR_AWAY
        };
        for p in &mut self.particles {
            p.update(cursor);
            canvas.save();
            canvas.translate(p.x, p.y);
            canvas.set_fill(p.color);
            canvas.fill_circle(0.0, 0.0, p.radius * p.scale);
            canvas.restore();
        }
    }
}
