use crate::render::{
    glyph_backdrop, luma_u8, text_frame_begin, text_frame_end, write_bg_rgb, write_fg_rgb, Frame,
    Renderer,
};
use std::io::Write;

/// Dark -> bright ramp. Keep it ASCII-safe and compact.
const RAMP: &[u8] = b" .,:;irsXA253hMHGS#9B&@";

pub struct AsciiRenderer {
    last_fg: Option<(u8, u8, u8)>,
    /// `None` means the terminal's default background.
    last_bg: Option<(u8, u8, u8)>,
}

impl Default for AsciiRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl AsciiRenderer {
    pub fn new() -> Self {
        Self {
            last_fg: None,
            last_bg: None,
        }
    }
}

pub fn ramp_char(l: u8) -> char {
    RAMP[l as usize * (RAMP.len() - 1) / 255] as char
}

impl Renderer for AsciiRenderer {
    fn name(&self) -> &'static str {
        "ascii"
    }

    fn cell_pixels(&self) -> (usize, usize) {
        (1, 1)
    }

    fn pixel_aspect(&self) -> f32 {
        2.0
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, visual_rows, w, _h)) = text_frame_begin(frame, 1, 1, out)? else {
            return Ok(());
        };

        self.last_fg = None;
        self.last_bg = None;

        for y in 0..visual_rows {
            for x in 0..cols {
                let idx = (y * w + x) * 4;
                let r = frame.pixels_rgba[idx];
                let g = frame.pixels_rgba[idx + 1];
                let b = frame.pixels_rgba[idx + 2];

                let (fg, bg, ch) = match frame.glyphs[y * w + x] {
                    Some(glyph) => (
                        (glyph.color.r, glyph.color.g, glyph.color.b),
                        Some(glyph_backdrop(glyph.color)),
                        glyph.ch,
                    ),
                    None => ((r, g, b), None, ramp_char(luma_u8(r, g, b))),
                };
                if self.last_bg != bg {
                    match bg {
                        Some((br, bg_, bb)) => write_bg_rgb(out, br, bg_, bb)?,
                        None => out.write_all(b"\x1b[49m")?,
                    }
                    self.last_bg = bg;
                }
                if self.last_fg != Some(fg) {
                    write_fg_rgb(out, fg.0, fg.1, fg.2)?;
                    self.last_fg = Some(fg);
                }
                write!(out, "{ch}")?;
            }
            out.write_all(b"\r\n")?;
        }

        text_frame_end(frame, cols, visual_rows, out)
    }
}
