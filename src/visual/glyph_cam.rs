use super::{RenderCtx, Settings, Sketch};
use crate::camera::{downsample, FrameSource};
use crate::canvas::Canvas;
use crate::color::BLACK;
use crate::params::ParamSet;

/// Half-width katakana, then digits. Darker cells pick earlier glyphs.
pub const GLYPHS: &[char] = &[
    'ｱ', 'ｲ', 'ｳ', 'ｴ', 'ｵ', 'ｶ', 'ｷ', 'ｸ', 'ｹ', 'ｺ', 'ｻ', 'ｼ', 'ｽ', 'ｾ', 'ｿ', '0', '1', '2', '3',
    '4', '5', '6', '7', '8', '9',
];

pub fn glyph_for_brightness(v: f32) -> char {
    let idx = ((v / 255.0) * (GLYPHS.len() - 1) as f32).floor();
    GLYPHS[(idx.max(0.0) as usize).min(GLYPHS.len() - 1)]
}

/// Camera filter: dark cells of the downsampled frame become black glyphs on a white page.
pub struct GlyphCam {
    params: ParamSet,
    source: Box<dyn FrameSource>,
}

impl GlyphCam {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            params: ParamSet::new()
                .int("cell", 15, 8, 40)
                .int("threshold", 70, 0, 153),
            source,
        }
    }
}

impl Sketch for GlyphCam {
    fn name(&self) -> &'static str {
        "glyph-cam"
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

    fn render(&mut self, ctx: &RenderCtx, canvas: &mut Canvas) {
        let Some(frame) = self.source.frame(ctx.time) else {
            return;
        };

        let (width, height) = (canvas.width(), canvas.height());
        let cell = self.params.get_int("cell").max(1) as f32;
        let threshold = self.params.get_int("threshold") as f32;
        let cols = (width / cell).floor().max(1.0) as u32;
        let rows = (height / cell).floor().max(1.0) as u32;

        canvas.clear();
        let small = downsample(frame, cols, rows);
        canvas.set_fill(BLACK);

        for (col, row, px) in small.enumerate_pixels() {
            let [r, g, b, _] = px.0;
            let brightness = (r as f32 + g as f32 + b as f32) / 5.0;
            if brightness >= threshold {
                continue;
            }
            let x = col as f32 * cell;
            let y = row as f32 * cell;
            canvas.fill_glyph(
                glyph_for_brightness(brightness),
                x + cell * 0.5,
                y + cell * 0.5,
                cell * 1.4,
            );
        }
    }
}
