//! Software 2D drawing surface.
//!
//! Sketches draw in a fixed logical coordinate space (e.g. 1080x1080). The
//! surface fits that space into an RGBA8 pixel buffer of whatever size the
//! output needs, so the same sketch renders into a terminal grid or a video
//! frame. Shapes are rasterized by evaluating a signed distance in the shape's
//! local space at every covered pixel center.

use crate::color::{Rgb, BLACK, WHITE};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Affine {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    pub fn rotation(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            a: c,
            b: s,
            c: -s,
            d: c,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn scaling(sx: f32, sy: f32) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    /// `self * m`: applies `m` first, then `self`.
    pub fn then(&self, m: &Self) -> Self {
        Self {
            a: self.a * m.a + self.c * m.b,
            b: self.b * m.a + self.d * m.b,
            c: self.a * m.c + self.c * m.d,
            d: self.b * m.c + self.d * m.d,
            e: self.a * m.e + self.c * m.f + self.e,
            f: self.b * m.e + self.d * m.f + self.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn det(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    pub fn invert(&self) -> Option<Self> {
        let det = self.det();
        if det.abs() < 1e-12 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        Some(Self {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            e: (self.c * self.f - self.d * self.e) * inv,
            f: (self.b * self.e - self.a * self.f) * inv,
        })
    }

    /// Geometric mean of the axis scales.
    pub fn scale_factor(&self) -> f32 {
        self.det().abs().sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub fn label(self) -> &'static str {
        match self {
            Self::Butt => "butt",
            Self::Round => "round",
            Self::Square => "square",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "butt" => Some(Self::Butt),
            "round" => Some(Self::Round),
            "square" => Some(Self::Square),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DrawState {
    transform: Affine,
    fill: Rgb,
    stroke: Rgb,
    line_width: f32,
    line_cap: LineCap,
    shadow_blur: f32,
    shadow_color: Rgb,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            fill: BLACK,
            stroke: BLACK,
            line_width: 1.0,
            line_cap: LineCap::Butt,
            shadow_blur: 0.0,
            shadow_color: BLACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    pub color: Rgb,
}

pub struct Canvas {
    logical_w: f32,
    logical_h: f32,
    w: usize,
    h: usize,
    base: Affine,
    clip: (usize, usize, usize, usize),
    pixels: Vec<u8>,
    glyphs: Vec<Option<Glyph>>,
    state: DrawState,
    stack: Vec<DrawState>,
    page: Rgb,
    letterbox: Rgb,
}

impl Canvas {
    pub fn new(logical_w: f32, logical_h: f32) -> Self {
        Self {
            logical_w: logical_w.max(1.0),
            logical_h: logical_h.max(1.0),
            w: 0,
            h: 0,
            base: Affine::IDENTITY,
            clip: (0, 0, 0, 0),
            pixels: Vec::new(),
            glyphs: Vec::new(),
            state: DrawState::default(),
            stack: Vec::new(),
            page: WHITE,
            letterbox: BLACK,
        }
    }

    /// Resizes the pixel buffer. `pixel_aspect` is the physical height of one
    /// pixel relative to its width (2.0 for one-pixel-per-cell text output).
    pub fn resize(&mut self, w: usize, h: usize, pixel_aspect: f32) {
        let aspect = if pixel_aspect.is_finite() && pixel_aspect > 0.0 {
            pixel_aspect
        } else {
            1.0
        };
        self.w = w;
        self.h = h;
        let phys_w = w as f32;
        let phys_h = h as f32 * aspect;
        let s = (phys_w / self.logical_w).min(phys_h / self.logical_h);
        let sx = s;
        let sy = s / aspect;
        let ox = (w as f32 - self.logical_w * sx) * 0.5;
        let oy = (h as f32 - self.logical_h * sy) * 0.5;
        self.base = Affine {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            e: ox,
            f: oy,
        };
        let x0 = ox.max(0.0).round() as usize;
        let y0 = oy.max(0.0).round() as usize;
        let x1 = ((ox + self.logical_w * sx).round().max(0.0) as usize).min(w);
        let y1 = ((oy + self.logical_h * sy).round().max(0.0) as usize).min(h);
        self.clip = (x0.min(x1), y0.min(y1), x1, y1);

        self.pixels.resize(w.saturating_mul(h).saturating_mul(4), 0);
        self.glyphs.clear();
        self.glyphs.resize(w.saturating_mul(h), None);
        let lb = self.letterbox;
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[lb.r, lb.g, lb.b, 255]);
        }
        self.clear();
    }

    pub fn width(&self) -> f32 {
        self.logical_w
    }

    pub fn height(&self) -> f32 {
        self.logical_h
    }

    pub fn pixel_width(&self) -> usize {
        self.w
    }

    pub fn pixel_height(&self) -> usize {
        self.h
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn glyphs(&self) -> &[Option<Glyph>] {
        &self.glyphs
    }

    /// Maps a pixel-space point (e.g. a terminal cell center) into logical coordinates.
    pub fn pixel_to_logical(&self, px: f32, py: f32) -> (f32, f32) {
        match self.base.invert() {
            Some(inv) => inv.apply(px, py),
            None => (px, py),
        }
    }

    /// Drops any transform and style left over from the previous frame.
    pub fn reset_state(&mut self) {
        self.state = DrawState::default();
        self.stack.clear();
    }

    pub fn save(&mut self) {
        self.stack.push(self.state);
    }

    pub fn restore(&mut self) {
        if let Some(s) = self.stack.pop() {
            self.state = s;
        }
    }

    pub fn translate(&mut self, tx: f32, ty: f32) {
        self.state.transform = self.state.transform.then(&Affine::translation(tx, ty));
    }

    pub fn rotate(&mut self, angle: f32) {
        self.state.transform = self.state.transform.then(&Affine::rotation(angle));
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.state.transform = self.state.transform.then(&Affine::scaling(sx, sy));
    }

    pub fn transform(&self) -> Affine {
        self.state.transform
    }

    pub fn set_fill(&mut self, c: Rgb) {
        self.state.fill = c;
    }

    pub fn set_stroke(&mut self, c: Rgb) {
        self.state.stroke = c;
    }

    /// Non-finite or non-positive widths are ignored, like a 2D context does.
    pub fn set_line_width(&mut self, w: f32) {
        if w.is_finite() && w > 0.0 {
            self.state.line_width = w;
        }
    }

    pub fn line_width(&self) -> f32 {
        self.state.line_width
    }

    pub fn set_line_cap(&mut self, cap: LineCap) {
        self.state.line_cap = cap;
    }

    pub fn set_shadow(&mut self, blur: f32, color: Rgb) {
        self.state.shadow_blur = if blur.is_finite() { blur.max(0.0) } else { 0.0 };
        self.state.shadow_color = color;
    }

    /// Resets the logical area to the page color and drops all glyphs.
    pub fn clear(&mut self) {
        let (x0, y0, x1, y1) = self.clip;
        let page = self.page;
        for y in y0..y1 {
            for x in x0..x1 {
                let i = (y * self.w + x) * 4;
                self.pixels[i..i + 4].copy_from_slice(&[page.r, page.g, page.b, 255]);
            }
        }
        self.glyphs.fill(None);
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let (hx, hy) = (w.abs() * 0.5, h.abs() * 0.5);
        let (cx, cy) = (x + w * 0.5, y + h * 0.5);
        let color = self.state.fill;
        self.draw_shape(
            (cx - hx, cy - hy, cx + hx, cy + hy),
            color,
            move |px, py| box_sdf(px - cx, py - cy, hx, hy),
        );
    }

    pub fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        let half = self.state.line_width * 0.5;
        let cap = self.state.line_cap;
        let dx = x1 - x0;
        let dy = y1 - y0;
        let len = (dx * dx + dy * dy).sqrt();
        if len < 1e-6 && cap == LineCap::Butt {
            return;
        }
        let (ux, uy) = if len < 1e-6 { (1.0, 0.0) } else { (dx / len, dy / len) };
        let (mx, my) = ((x0 + x1) * 0.5, (y0 + y1) * 0.5);
        let along_half = match cap {
            LineCap::Butt | LineCap::Round => len * 0.5,
            LineCap::Square => len * 0.5 + half,
        };
        let pad = along_half + half;
        let bbox = (mx - pad, my - pad, mx + pad, my + pad);
        let color = self.state.stroke;
        let sdf = move |px: f32, py: f32| {
            let rx = px - mx;
            let ry = py - my;
            let along = rx * ux + ry * uy;
            let perp = -rx * uy + ry * ux;
            match cap {
                LineCap::Round => {
                    let t = along.clamp(-len * 0.5, len * 0.5);
                    let ex = along - t;
                    (ex * ex + perp * perp).sqrt() - half
                }
                LineCap::Butt | LineCap::Square => box_sdf(along, perp, along_half, half),
            }
        };
        self.draw_glow(bbox, sdf);
        self.draw_shape(bbox, color, sdf);
    }

    /// Strokes an axis-aligned rectangle (in local space) with mitered corners.
    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let half = self.state.line_width * 0.5;
        let (hx, hy) = (w.abs() * 0.5, h.abs() * 0.5);
        let (cx, cy) = (x + w * 0.5, y + h * 0.5);
        let bbox = (cx - hx - half, cy - hy - half, cx + hx + half, cy + hy + half);
        let color = self.state.stroke;
        let sdf = move |px: f32, py: f32| {
            let outer = box_sdf(px - cx, py - cy, hx + half, hy + half);
            let inner = box_sdf(px - cx, py - cy, (hx - half).max(0.0), (hy - half).max(0.0));
            if hx <= half || hy <= half {
                outer
            } else {
                outer.max(-inner)
            }
        };
        self.draw_glow(bbox, sdf);
        self.draw_shape(bbox, color, sdf);
    }

    /// Zero or negative radii draw nothing.
    pub fn stroke_circle(&mut self, cx: f32, cy: f32, r: f32) {
        if r.is_nan() || r <= 0.0 {
            return;
        }
        let half = self.state.line_width * 0.5;
        let pad = r + half;
        let bbox = (cx - pad, cy - pad, cx + pad, cy + pad);
        let color = self.state.stroke;
        let sdf = move |px: f32, py: f32| {
            let dx = px - cx;
            let dy = py - cy;
            ((dx * dx + dy * dy).sqrt() - r).abs() - half
        };
        self.draw_glow(bbox, sdf);
        self.draw_shape(bbox, color, sdf);
    }

    pub fn fill_circle(&mut self, cx: f32, cy: f32, r: f32) {
        let r = r.abs();
        let bbox = (cx - r, cy - r, cx + r, cy + r);
        let color = self.state.fill;
        let sdf = move |px: f32, py: f32| {
            let dx = px - cx;
            let dy = py - cy;
            (dx * dx + dy * dy).sqrt() - r
        };
        self.draw_glow(bbox, sdf);
        self.draw_shape(bbox, color, sdf);
    }

    /// Draws a character centered at `(x, y)` with the given font size.
    ///
    /// The character is recorded in the glyph layer (text renderers print it)
    /// and a small bitmap of it is stamped into the pixels.
    pub fn fill_glyph(&mut self, ch: char, x: f32, y: f32, size: f32) {
        let color = self.state.fill;
        let m = self.base.then(&self.state.transform);
        let (px, py) = m.apply(x, y);
        let (x0, y0, x1, y1) = self.clip;
        if px >= x0 as f32 && py >= y0 as f32 && px < x1 as f32 && py < y1 as f32 {
            let idx = py as usize * self.w + px as usize;
            self.glyphs[idx] = Some(Glyph { ch, color });
        }

        let Some(bits) = glyph_bitmap(ch) else {
            return;
        };
        let gw = size * 0.5;
        let gh = size * 0.7;
        let (left, top) = (x - gw * 0.5, y - gh * 0.5);
        self.draw_shape((left, top, left + gw, top + gh), color, move |lx, ly| {
            let u = (lx - left) / gw;
            let v = (ly - top) / gh;
            if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                return 1.0;
            }
            let col = (u * 3.0) as usize;
            let row = (v * 5.0) as usize;
            if bits[row.min(4)] & (0b100 >> col.min(2)) != 0 {
                -1.0
            } else {
                1.0
            }
        });
    }

    fn draw_glow(&mut self, bbox: (f32, f32, f32, f32), sdf: impl Fn(f32, f32) -> f32) {
        if self.state.shadow_blur <= 0.0 {
            return;
        }
        let user_scale = self.state.transform.scale_factor().max(1e-6);
        let reach = self.state.shadow_blur / user_scale;
        let color = self.state.shadow_color;
        let (x0, y0, x1, y1) = bbox;
        let grown = (x0 - reach, y0 - reach, x1 + reach, y1 + reach);
        self.rasterize(grown, color, |lx, ly, _aa| {
            let d = sdf(lx, ly);
            if d <= 0.0 {
                return 0.55;
            }
            let t = (1.0 - d / reach).clamp(0.0, 1.0);
            0.55 * t * t
        });
    }

    fn draw_shape(
        &mut self,
        bbox: (f32, f32, f32, f32),
        color: Rgb,
        sdf: impl Fn(f32, f32) -> f32,
    ) {
        self.rasterize(bbox, color, |lx, ly, aa| {
            (0.5 - sdf(lx, ly) / aa).clamp(0.0, 1.0)
        });
    }

    /// Walks the pixels covered by a local-space bounding box and blends `color`
    /// with the coverage returned for each pixel center.
    fn rasterize(
        &mut self,
        bbox: (f32, f32, f32, f32),
        color: Rgb,
        coverage: impl Fn(f32, f32, f32) -> f32,
    ) {
        let (cx0, cy0, cx1, cy1) = self.clip;
        if cx0 >= cx1 || cy0 >= cy1 {
            return;
        }
        let m = self.base.then(&self.state.transform);
        let Some(inv) = m.invert() else {
            return;
        };

        let (bx0, by0, bx1, by1) = bbox;
        let corners = [
            m.apply(bx0, by0),
            m.apply(bx1, by0),
            m.apply(bx0, by1),
            m.apply(bx1, by1),
        ];
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for (x, y) in corners {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return;
        }
        let px0 = ((min_x - 1.0).floor().max(cx0 as f32)) as usize;
        let py0 = ((min_y - 1.0).floor().max(cy0 as f32)) as usize;
        let px1 = ((max_x + 1.0).ceil().min(cx1 as f32)).max(0.0) as usize;
        let py1 = ((max_y + 1.0).ceil().min(cy1 as f32)).max(0.0) as usize;

        // Local-space length of one pixel step, used as the anti-aliasing width.
        let step_x = (inv.a * inv.a + inv.b * inv.b).sqrt();
        let step_y = (inv.c * inv.c + inv.d * inv.d).sqrt();
        let aa = ((step_x + step_y) * 0.5).max(1e-6);

        let (sr, sg, sb) = (color.r as f32, color.g as f32, color.b as f32);
        for py in py0..py1 {
            for px in px0..px1 {
                let (lx, ly) = inv.apply(px as f32 + 0.5, py as f32 + 0.5);
                let a = coverage(lx, ly, aa);
                if a <= 0.0 {
                    continue;
                }
                let i = (py * self.w + px) * 4;
                let ia = 1.0 - a;
                let dst = &mut self.pixels[i..i + 3];
                dst[0] = (sr * a + dst[0] as f32 * ia).round() as u8;
                dst[1] = (sg * a + dst[1] as f32 * ia).round() as u8;
                dst[2] = (sb * a + dst[2] as f32 * ia).round() as u8;
            }
        }
    }
}

fn box_sdf(px: f32, py: f32, hx: f32, hy: f32) -> f32 {
    let qx = px.abs() - hx;
    let qy = py.abs() - hy;
    let ox = qx.max(0.0);
    let oy = qy.max(0.0);
    (ox * ox + oy * oy).sqrt() + qx.max(qy).min(0.0)
}

/// 3x5 bitmaps (top row first, MSB is the left column).
fn glyph_bitmap(ch: char) -> Option<[u8; 5]> {
    let bits = match ch {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'ｱ' => [0b111, 0b001, 0b010, 0b010, 0b100],
        'ｲ' => [0b001, 0b010, 0b110, 0b010, 0b010],
        'ｳ' => [0b010, 0b111, 0b101, 0b001, 0b010],
        'ｴ' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'ｵ' => [0b010, 0b111, 0b010, 0b110, 0b010],
        'ｶ' => [0b010, 0b111, 0b011, 0b010, 0b101],
        'ｷ' => [0b010, 0b111, 0b010, 0b111, 0b010],
        'ｸ' => [0b011, 0b101, 0b001, 0b001, 0b110],
        'ｹ' => [0b100, 0b111, 0b101, 0b001, 0b010],
        'ｺ' => [0b111, 0b001, 0b001, 0b001, 0b111],
        'ｻ' => [0b101, 0b111, 0b101, 0b001, 0b010],
        'ｼ' => [0b100, 0b001, 0b100, 0b001, 0b110],
        'ｽ' => [0b111, 0b001, 0b010, 0b101, 0b100],
        'ｾ' => [0b100, 0b111, 0b101, 0b100, 0b011],
        'ｿ' => [0b101, 0b101, 0b001, 0b001, 0b110],
        _ => return None,
    };
    Some(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(c: &Canvas, x: usize, y: usize) -> [u8; 3] {
        let i = (y * c.pixel_width() + x) * 4;
        [c.pixels()[i], c.pixels()[i + 1], c.pixels()[i + 2]]
    }

    #[test]
    fn affine_inverse_round_trips() {
        let m = Affine::translation(10.0, -4.0)
            .then(&Affine::rotation(0.7))
            .then(&Affine::scaling(2.0, 0.5));
        let inv = m.invert().expect("invertible");
        let (x, y) = m.apply(3.0, 5.0);
        let (bx, by) = inv.apply(x, y);
        assert!((bx - 3.0).abs() < 1e-4 && (by - 5.0).abs() < 1e-4);
        assert!(Affine::scaling(0.0, 1.0).invert().is_none());
    }

    #[test]
    fn fit_letterboxes_and_honors_pixel_aspect() {
        let mut c = Canvas::new(100.0, 100.0);
        c.resize(40, 20, 2.0);
        // 40 wide x 40 tall physically -> full-bleed square.
        let (lx, ly) = c.pixel_to_logical(0.0, 0.0);
        assert!(lx.abs() < 1e-3 && ly.abs() < 1e-3);
        let (lx, ly) = c.pixel_to_logical(40.0, 20.0);
        assert!((lx - 100.0).abs() < 1e-3 && (ly - 100.0).abs() < 1e-3);

        c.resize(60, 20, 1.0);
        // Square logical area is 20x20 centered horizontally; the rest is letterbox.
        assert_eq!(px(&c, 2, 10), [0, 0, 0]);
        assert_eq!(px(&c, 30, 10), [255, 255, 255]);
    }

    #[test]
    fn fill_rect_covers_logical_area() {
        let mut c = Canvas::new(10.0, 10.0);
        c.resize(10, 10, 1.0);
        c.set_fill(Rgb::new(5, 5, 16));
        c.fill_rect(0.0, 0.0, 10.0, 10.0);
        assert_eq!(px(&c, 0, 0), [5, 5, 16]);
        assert_eq!(px(&c, 9, 9), [5, 5, 16]);
    }

    #[test]
    fn butt_and_square_caps_differ_at_line_ends() {
        let mut butt = Canvas::new(40.0, 40.0);
        butt.resize(40, 40, 1.0);
        butt.set_line_width(6.0);
        butt.stroke_line(10.0, 20.0, 30.0, 20.0);

        let mut square = Canvas::new(40.0, 40.0);
        square.resize(40, 40, 1.0);
        square.set_line_width(6.0);
        square.set_line_cap(LineCap::Square);
        square.stroke_line(10.0, 20.0, 30.0, 20.0);

        assert_eq!(px(&butt, 20, 20), [0, 0, 0]);
        assert_eq!(px(&butt, 8, 20), [255, 255, 255]);
        assert_eq!(px(&square, 8, 20), [0, 0, 0]);
    }

    #[test]
    fn zero_radius_circle_strokes_nothing() {
        let mut c = Canvas::new(40.0, 40.0);
        c.resize(40, 40, 1.0);
        c.set_line_width(8.0);
        c.stroke_circle(20.0, 20.0, 0.0);
        assert!(c.pixels().iter().all(|v| *v == 255));

        c.stroke_circle(20.0, 20.0, 10.0);
        assert_eq!(px(&c, 30, 20), [0, 0, 0]);
        assert_eq!(px(&c, 20, 20), [255, 255, 255]);
    }

    #[test]
    fn rotation_turns_a_horizontal_line_vertical() {
        let mut c = Canvas::new(40.0, 40.0);
        c.resize(40, 40, 1.0);
        c.set_line_width(2.0);
        c.translate(20.0, 20.0);
        c.rotate(std::f32::consts::FRAC_PI_2);
        c.stroke_line(-10.0, 0.0, 10.0, 0.0);
        assert_eq!(px(&c, 20, 13), [0, 0, 0]);
        assert_eq!(px(&c, 13, 20), [255, 255, 255]);
    }

    #[test]
    fn save_restore_scopes_transform_and_style() {
        let mut c = Canvas::new(10.0, 10.0);
        c.resize(10, 10, 1.0);
        c.save();
        c.translate(3.0, 4.0);
        c.set_line_width(7.0);
        c.restore();
        assert_eq!(c.transform(), Affine::IDENTITY);
        assert!((c.line_width() - 1.0).abs() < 1e-6);
        c.set_line_width(-2.0);
        c.set_line_width(f32::NAN);
        assert!((c.line_width() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn glyphs_land_in_the_layer_and_clear_drops_them() {
        let mut c = Canvas::new(30.0, 30.0);
        c.resize(30, 30, 1.0);
        c.fill_glyph('7', 15.0, 15.0, 20.0);
        assert_eq!(
            c.glyphs()[15 * 30 + 15],
            Some(Glyph {
                ch: '7',
                color: BLACK
            })
        );
        c.clear();
        assert!(c.glyphs().iter().all(Option::is_none));
    }
}
