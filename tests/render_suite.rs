use tui_sketchbook::canvas::{Canvas, Glyph};
use tui_sketchbook::color::Rgb;
use tui_sketchbook::config::RendererMode;
use tui_sketchbook::render::{make_renderer, AsciiRenderer, Frame, HalfBlockRenderer, Renderer};

/// Build a solid-color RGBA pixel buffer.
fn solid_pixels(w: usize, h: usize, r: u8, g: u8, b: u8) -> Vec<u8> {
    let mut buf = vec![0u8; w * h * 4];
    for px in buf.chunks_exact_mut(4) {
        px[0] = r;
        px[1] = g;
        px[2] = b;
        px[3] = 255;
    }
    buf
}

/// Build a gradient pixel buffer (varies across x).
fn gradient_pixels(w: usize, h: usize) -> Vec<u8> {
    let mut buf = vec![0u8; w * h * 4];
    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) * 4;
            let t = (x as f32 / w.max(1) as f32 * 255.0) as u8;
            buf[i] = t;
            buf[i + 1] = 128;
            buf[i + 2] = 255 - t;
            buf[i + 3] = 255;
        }
    }
    buf
}

fn make_frame<'a>(
    cols: u16,
    visual_rows: u16,
    pw: usize,
    ph: usize,
    pixels: &'a [u8],
    glyphs: &'a [Option<Glyph>],
    sync: bool,
) -> Frame<'a> {
    Frame {
        term_cols: cols,
        term_rows: visual_rows + 2,
        visual_rows,
        pixel_width: pw,
        pixel_height: ph,
        pixels_rgba: pixels,
        glyphs,
        hud: "Sketch: neon-grid | FPS 30",
        hud_rows: 1,
        panel: None,
        overlay: None,
        sync_updates: sync,
    }
}

// ── ASCII renderer ──────────────────────────────────────────────────────────

#[test]
fn ascii_renders_solid_frame() {
    let cols = 10u16;
    let rows = 5u16;
    let pixels = solid_pixels(cols as usize, rows as usize, 200, 200, 200);
    let glyphs = vec![None; cols as usize * rows as usize];
    let frame = make_frame(cols, rows, cols as usize, rows as usize, &pixels, &glyphs, false);
    let mut out = Vec::new();
    let mut renderer = AsciiRenderer::new();
    renderer.render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("\x1b[H"), "missing home cursor");
    assert!(s.contains("\x1b[?7l"), "missing autowrap-off");
    assert!(s.contains("\x1b[?7h"), "missing autowrap-on");
    assert!(s.contains("38;2;200;200;200"), "missing FG color");
    assert!(s.contains("FPS 30"), "HUD text missing");
    assert!(!s.contains("\x1b[?2026h"), "sync updates were disabled");
}

#[test]
fn ascii_skips_zero_size() {
    let pixels = solid_pixels(1, 1, 0, 0, 0);
    let frame = make_frame(0, 0, 0, 0, &pixels, &[], false);
    let mut out = Vec::new();
    AsciiRenderer::new().render(&frame, &mut out).unwrap();
    assert!(out.is_empty(), "expected empty output for zero-size frame");
}

#[test]
fn ascii_prints_glyph_over_white_backdrop() {
    let pixels = solid_pixels(4, 2, 255, 255, 255);
    let mut glyphs = vec![None; 8];
    glyphs[5] = Some(Glyph {
        ch: 'ｱ',
        color: Rgb::new(0, 0, 0),
    });
    let frame = make_frame(4, 2, 4, 2, &pixels, &glyphs, false);
    let mut out = Vec::new();
    AsciiRenderer::new().render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains('ｱ'));
    assert!(s.contains("48;2;255;255;255"), "dark glyph needs a light backdrop");
    assert!(s.contains("38;2;0;0;0"));
}

// ── HalfBlock renderer ─────────────────────────────────────────────────────

#[test]
fn halfblock_renders_gradient_frame() {
    let cols = 8u16;
    let rows = 4u16;
    let pw = cols as usize;
    let ph = (rows as usize) * 2;
    let pixels = gradient_pixels(pw, ph);
    let glyphs = vec![None; pw * ph];
    let frame = make_frame(cols, rows, pw, ph, &pixels, &glyphs, true);
    let mut out = Vec::new();
    let mut renderer = HalfBlockRenderer::new();
    renderer.render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("\x1b[?2026h"), "missing sync-begin");
    assert!(s.contains("\x1b[?2026l"), "missing sync-end");
    assert!(s.contains("\u{2580}"), "missing half-block char");
    assert!(s.contains("38;2;"), "missing FG escape");
    assert!(s.contains("48;2;"), "missing BG escape");
}

#[test]
fn halfblock_rejects_mismatched_geometry() {
    let pixels = solid_pixels(8, 4, 10, 10, 10);
    let glyphs = vec![None; 32];
    // 4 rows of half-blocks need 8 pixel rows, not 4.
    let frame = make_frame(8, 4, 8, 4, &pixels, &glyphs, false);
    let mut out = Vec::new();
    HalfBlockRenderer::new().render(&frame, &mut out).unwrap();
    assert!(out.is_empty());
}

#[test]
fn halfblock_reports_short_buffer() {
    let pixels = solid_pixels(2, 2, 10, 10, 10);
    let glyphs = vec![None; 4];
    let frame = make_frame(4, 2, 4, 4, &pixels, &glyphs, false);
    let mut out = Vec::new();
    HalfBlockRenderer::new().render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("pixel buffer too small"));
}

#[test]
fn panel_and_overlay_are_drawn() {
    let pw = 40usize;
    let rows = 12u16;
    let pixels = solid_pixels(pw, rows as usize * 2, 0, 0, 0);
    let glyphs = vec![None; pw * rows as usize * 2];
    let mut frame = make_frame(40, rows, pw, rows as usize * 2, &pixels, &glyphs, false);
    frame.panel = Some("  neon-grid\n> cols 6\n  rows 6");
    frame.overlay = Some("Hotkeys\nq quit");
    let mut out = Vec::new();
    HalfBlockRenderer::new().render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("> cols 6"));
    assert!(s.contains("255;236;160"), "selected row highlight missing");
    assert!(s.contains("Hotkeys"));
    assert!(s.contains("q quit"));
}

// ── Canvas to terminal ─────────────────────────────────────────────────────

#[test]
fn renderer_geometry_matches_mode() {
    let hb = make_renderer(RendererMode::HalfBlock);
    assert_eq!(hb.name(), "half-block");
    assert_eq!(hb.cell_pixels(), (1, 2));
    assert_eq!(hb.pixel_aspect(), 1.0);

    let ascii = make_renderer(RendererMode::Ascii);
    assert_eq!(ascii.name(), "ascii");
    assert_eq!(ascii.cell_pixels(), (1, 1));
    assert_eq!(ascii.pixel_aspect(), 2.0);
}

#[test]
fn canvas_output_renders_through_halfblock() {
    let (cols, rows) = (40u16, 10u16);
    let (pw, ph) = (cols as usize, rows as usize * 2);
    let mut canvas = Canvas::new(1080.0, 1080.0);
    canvas.resize(pw, ph, 1.0);
    canvas.set_fill(Rgb::new(255, 0, 64));
    canvas.fill_rect(0.0, 0.0, 1080.0, 1080.0);

    let frame = make_frame(cols, rows, pw, ph, canvas.pixels(), canvas.glyphs(), false);
    let mut out = Vec::new();
    HalfBlockRenderer::new().render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("38;2;255;0;64"));
    // Letterbox bars stay black.
    assert!(s.contains("38;2;0;0;0") || s.contains("48;2;0;0;0"));
}
