use crate::render::{
    glyph_backdrop, text_frame_begin, text_frame_end, write_bg_rgb, write_fg_rgb, Frame, Renderer,
};
use std::io::Write;

const HALF_BLOCK: char = '\u{2580}';

pub struct HalfBlockRenderer {
    last_fg: Option<(u8, u8, u8)>,
    last_bg: Option<(u8, u8, u8)>,
}

impl Default for HalfBlockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HalfBlockRenderer {
    pub fn new() -> Self {
        Self {
            last_fg: None,
            last_bg: None,
        }
    }

    fn set_colors(
        &mut self,
        out: &mut dyn Write,
        fg: (u8, u8, u8),
        bg: (u8, u8, u8),
    ) -> std::io::Result<()> {
        if self.last_fg != Some(fg) {
            write_fg_rgb(out, fg.0, fg.1, fg.2)?;
            self.last_fg = Some(fg);
        }
        if self.last_bg != Some(bg) {
            write_bg_rgb(out, bg.0, bg.1, bg.2)?;
            self.last_bg = Some(bg);
        }
        Ok(())
    }
}

impl Renderer for HalfBlockRenderer {
    fn name(&self) -> &'static str {
        "half-block"
    }

    fn cell_pixels(&self) -> (usize, usize) {
        (1, 2)
    }

    fn pixel_aspect(&self) -> f32 {
        1.0
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, visual_rows, w, _h)) = text_frame_begin(frame, 1, 2, out)? else {
            return Ok(());
        };
        self.last_fg = None;
        self.last_bg = None;

        let px = |i: usize| {
            (
                frame.pixels_rgba[i],
                frame.pixels_rgba[i + 1],
                frame.pixels_rgba[i + 2],
            )
        };

        for row in 0..visual_rows {
            let top_y = row * 2;
            let bot_y = top_y + 1;
            for x in 0..cols {
                let top = px((top_y * w + x) * 4);
                let bot = px((bot_y * w + x) * 4);

                let glyph = frame.glyphs[top_y * w + x].or(frame.glyphs[bot_y * w + x]);
                match glyph {
                    Some(g) => {
                        let fg = (g.color.r, g.color.g, g.color.b);
                        self.set_colors(out, fg, glyph_backdrop(g.color))?;
                        write!(out, "{}", g.ch)?;
                    }
                    None => {
                        self.set_colors(out, top, bot)?;
                        write!(out, "{HALF_BLOCK}")?;
                    }
                }
            }
            // Next line (CRLF) with autowrap disabled.
            out.write_all(b"\r\n")?;
        }

        text_frame_end(frame, cols, visual_rows, out)
    }
}
