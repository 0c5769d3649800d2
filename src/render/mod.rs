mod ascii;
mod halfblock;

pub use ascii::AsciiRenderer;
pub use halfblock::HalfBlockRenderer;

pub use crate::color::luma_u8;

use crate::canvas::Glyph;
use crate::color::Rgb;
use crate::config::RendererMode;
use std::io::Write;

pub struct Frame<'a> {
    pub term_cols: u16,
    pub term_rows: u16,
    pub visual_rows: u16,
    pub pixel_width: usize,
    pub pixel_height: usize,
    pub pixels_rgba: &'a [u8],
    /// Per-pixel characters drawn by sketches; printed in place of the pixel.
    pub glyphs: &'a [Option<Glyph>],
    pub hud: &'a str,
    pub hud_rows: u16,
    pub panel: Option<&'a str>,
    pub overlay: Option<&'a str>,
    pub sync_updates: bool,
}

pub trait Renderer {
    fn name(&self) -> &'static str;
    /// Pixels per terminal cell as (columns, rows).
    fn cell_pixels(&self) -> (usize, usize);
    /// Physical height of one pixel relative to its width.
    fn pixel_aspect(&self) -> f32;
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

pub fn make_renderer(mode: RendererMode) -> Box<dyn Renderer> {
    match mode {
        RendererMode::HalfBlock => Box::new(HalfBlockRenderer::new()),
        RendererMode::Ascii => Box::new(AsciiRenderer::new()),
    }
}

/// Background behind a printed glyph: white under dark glyphs, black under light ones.
pub(crate) fn glyph_backdrop(c: Rgb) -> (u8, u8, u8) {
    if c.luma() < 128 {
        (255, 255, 255)
    } else {
        (0, 0, 0)
    }
}

pub(crate) fn write_fg_rgb(out: &mut dyn Write, r: u8, g: u8, b: u8) -> std::io::Result<()> {
    write!(out, "\x1b[38;2;{};{};{}m", r, g, b)
}

pub(crate) fn write_bg_rgb(out: &mut dyn Write, r: u8, g: u8, b: u8) -> std::io::Result<()> {
    write!(out, "\x1b[48;2;{};{};{}m", r, g, b)
}

/// Validates the frame geometry, opens a synchronized update and homes the cursor.
/// Returns `(cols, visual_rows, pixel_w, pixel_h)` or `None` when nothing can be drawn.
pub(crate) fn text_frame_begin(
    frame: &Frame<'_>,
    px_per_col: usize,
    px_per_row: usize,
    out: &mut dyn Write,
) -> anyhow::Result<Option<(usize, usize, usize, usize)>> {
    let cols = frame.term_cols as usize;
    let visual_rows = frame.visual_rows as usize;
    let w = frame.pixel_width;
    let h = frame.pixel_height;

    if cols == 0 || visual_rows == 0 || w == 0 || h == 0 {
        return Ok(None);
    }
    if w != cols.saturating_mul(px_per_col) || h != visual_rows.saturating_mul(px_per_row) {
        return Ok(None);
    }

    let need = w.saturating_mul(h).saturating_mul(4);
    if frame.pixels_rgba.len() < need || frame.glyphs.len() < w.saturating_mul(h) {
        if frame.sync_updates {
            out.write_all(b"\x1b[?2026h")?;
        }
        out.write_all(b"\x1b[H\x1b[0m\x1b[2J")?;
        write!(
            out,
            "pixel buffer too small (need {}, got {})",
            need,
            frame.pixels_rgba.len()
        )?;
        if frame.sync_updates {
            out.write_all(b"\x1b[?2026l")?;
        }
        out.flush()?;
        return Ok(None);
    }

    if frame.sync_updates {
        out.write_all(b"\x1b[?2026h")?;
    }
    // Home, reset, and disable autowrap (DECAWM) while painting full-width rows.
    out.write_all(b"\x1b[H\x1b[0m\x1b[?7l")?;
    Ok(Some((cols, visual_rows, w, h)))
}

/// Paints the HUD rows, the parameter panel and the popup overlay, then closes the update.
pub(crate) fn text_frame_end(
    frame: &Frame<'_>,
    cols: usize,
    visual_rows: usize,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut hud_lines = frame.hud.lines();
    for i in 0..(frame.hud_rows as usize) {
        write!(out, "\x1b[{};1H\x1b[0m\x1b[2K", visual_rows + i + 1)?;
        if let Some(line) = hud_lines.next() {
            let clipped: String = line.chars().take(cols).collect();
            write!(out, "{clipped}")?;
        }
    }

    if let Some(text) = frame.panel {
        draw_side_panel(out, frame.term_cols, frame.visual_rows, text)?;
    }
    if let Some(text) = frame.overlay {
        draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
    }

    // Restore autowrap.
    out.write_all(b"\x1b[?7h")?;
    if frame.sync_updates {
        out.write_all(b"\x1b[?2026l")?;
    }
    out.flush()?;
    Ok(())
}

/// Left-aligned parameter list. A leading `>` marks the selected row.
pub fn draw_side_panel(
    out: &mut dyn Write,
    term_cols: u16,
    visual_rows: u16,
    text: &str,
) -> anyhow::Result<()> {
    let cols = term_cols as usize;
    let rows = visual_rows as usize;
    if cols < 12 || rows < 3 {
        return Ok(());
    }
    let width = text
        .lines()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .min(cols.saturating_sub(4))
        .max(8);

    for (i, line) in text.lines().take(rows.saturating_sub(1)).enumerate() {
        let selected = line.starts_with('>');
        let (fg, bg) = if selected {
            ((10, 14, 24), (255, 236, 160))
        } else {
            ((236, 242, 255), (10, 14, 24))
        };
        let clipped: String = line.chars().take(width).collect();
        write!(out, "\x1b[{};2H\x1b[0m", i + 2)?;
        write_fg_rgb(out, fg.0, fg.1, fg.2)?;
        write_bg_rgb(out, bg.0, bg.1, bg.2)?;
        write!(out, " {clipped:<width$} ")?;
    }
    out.write_all(b"\x1b[0m")?;
    Ok(())
}

pub fn draw_overlay_popup(
    out: &mut dyn Write,
    term_cols: u16,
    term_rows: u16,
    text: &str,
) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }

    let cols = term_cols as usize;
    let rows = term_rows as usize;
    if cols < 8 || rows < 4 {
        return Ok(());
    }

    let max_inner_w = cols.saturating_sub(6).max(1);
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        let chars: Vec<char> = raw.chars().collect();
        for chunk in chars.chunks(max_inner_w) {
            lines.push(chunk.iter().collect());
        }
    }
    if lines.is_empty() {
        return Ok(());
    }

    let inner_w = lines
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(1, max_inner_w);
    let box_w = (inner_w + 4).min(cols.saturating_sub(2)).max(4);
    let inner_w = box_w.saturating_sub(4);
    let body_h = lines.len().min(rows.saturating_sub(3).max(1));
    let box_h = (body_h + 2).min(rows.saturating_sub(1)).max(3);

    let start_col = (cols.saturating_sub(box_w)) / 2 + 1;
    let start_row = (rows.saturating_sub(box_h)) / 2 + 1;

    let horiz = "-".repeat(box_w.saturating_sub(2));
    let blank = " ".repeat(inner_w);

    out.write_all(b"\x1b[0m\x1b[38;2;236;242;255m\x1b[48;2;10;14;24m")?;
    write!(out, "\x1b[{};{}H+{}+", start_row, start_col, horiz)?;
    for (i, line) in lines.iter().take(body_h).enumerate() {
        let row = start_row + 1 + i;
        write!(out, "\x1b[{};{}H| {} |", row, start_col, blank)?;
        if i == 0 {
            write!(
                out,
                "\x1b[{};{}H\x1b[1m\x1b[38;2;255;236;160m{}\x1b[22m\x1b[38;2;236;242;255m",
                row,
                start_col + 2,
                line
            )?;
        } else {
            write!(out, "\x1b[{};{}H{}", row, start_col + 2, line)?;
        }
    }
    write!(out, "\x1b[{};{}H+{}+", start_row + box_h - 1, start_col, horiz)?;
    out.write_all(b"\x1b[0m")?;
    Ok(())
}
