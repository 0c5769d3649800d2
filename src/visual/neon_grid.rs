use super::{PointerEvent, PointerKind, RenderCtx, Settings, Sketch};
use crate::canvas::Canvas;
use crate::color::Rgb;
use crate::params::ParamSet;
use std::collections::HashSet;

const BACKGROUND: Rgb = Rgb::new(5, 5, 16);
const RESET_ACTION: &str = "resetActiveCells";

/// Cell geometry of the grid for a given canvas width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub cols: usize,
    pub rows: usize,
    pub cell: f32,
    pub gap: f32,
    pub start_x: f32,
    pub start_y: f32,
}

impl GridLayout {
    pub fn new(width: f32, height: f32, cols: usize, rows: usize, gap_frac: f32) -> Self {
        let gap = width * gap_frac;
        let cell = width / (cols as f32 + 2.0);
        let total_w = cols as f32 * cell + cols.saturating_sub(1) as f32 * gap;
        let total_h = rows as f32 * cell + rows.saturating_sub(1) as f32 * gap;
        Self {
            cols,
            rows,
            cell,
            gap,
            start_x: (width - total_w) / 2.0,
            start_y: (height - total_h) / 2.0,
        }
    }

    pub fn origin(&self, i: usize, j: usize) -> (f32, f32) {
        (
            self.start_x + i as f32 * (self.cell + self.gap),
            self.start_y + j as f32 * (self.cell + self.gap),
        )
    }

    /// Cell whose box strictly contains the point.
    pub fn cell_at(&self, mx: f32, my: f32) -> Option<(usize, usize)> {
        for i in 0..self.cols {
            for j in 0..self.rows {
                let (x, y) = self.origin(i, j);
                if mx > x && mx < x + self.cell && my > y && my < y + self.cell {
                    return Some((i, j));
                }
            }
        }
        None
    }
}

/// Pulsing, rotating neon squares and rings; clicking a cell toggles its rotation.
pub struct NeonGrid {
    params: ParamSet,
    active: HashSet<(usize, usize)>,
    width: f32,
    height: f32,
}

impl Default for NeonGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl NeonGrid {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .int("cols", 6, 2, 15)
            .int("rows", 6, 2, 15)
            .float("gap", 0.03, 0.01, 0.1, None)
            .float("lineWidth", 0.004, 0.002, 0.02, None)
            .float("shapeScale", 0.3, 0.1, 0.5, None)
            .float("pulseSpeed", 1.0, 0.1, 5.0, None)
            .float("colorSpeed", 60.0, 10.0, 200.0, None)
            .float("glowStrength", 40.0, 0.0, 100.0, None)
            .float("rotationSpeed", 2.0, 0.0, 10.0, None)
            .float("depthAmount", 0.4, 0.0, 1.0, None)
            .bool("alternateRotation", true)
            .bool("interactive", true)
            .action(RESET_ACTION, "Reset Active Cells");
        Self {
            params,
            active: HashSet::new(),
            width: 1080.0,
            height: 1080.0,
        }
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout::new(
            self.width,
            self.height,
            self.params.get_int("cols").max(1) as usize,
            self.params.get_int("rows").max(1) as usize,
            self.params.get_float("gap"),
        )
    }

    pub fn is_active(&self, i: usize, j: usize) -> bool {
        self.active.contains(&(i, j))
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn reset_active(&mut self) {
        self.active.clear();
    }

    fn toggle(&mut self, cell: (usize, usize)) {
        if !self.active.remove(&cell) {
            self.active.insert(cell);
        }
    }
}

/// Hue in degrees, drifting with time and stepping 25 per row and column.
pub fn cell_hue(time: f32, color_speed: f32, i: usize, j: usize) -> f32 {
    (time * color_speed + i as f32 * 25.0 + j as f32 * 25.0).rem_euclid(360.0)
}

/// Odd cells spin the other way when rotation alternates.
pub fn rotation_direction(alternate: bool, i: usize, j: usize) -> f32 {
    if alternate && (i + j) % 2 != 0 {
        -1.0
    } else {
        1.0
    }
}

impl Sketch for NeonGrid {
    fn name(&self) -> &'static str {
        "neon-grid"
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
        if ev.kind != PointerKind::Down || !self.params.get_bool("interactive") {
            return;
        }
        if let Some(cell) = self.layout().cell_at(ev.x, ev.y) {
            self.toggle(cell);
        }
    }

    fn render(&mut self, ctx: &RenderCtx, canvas: &mut Canvas) {
        if self.params.take_action(RESET_ACTION) {
            self.reset_active();
        }
        self.width = canvas.width();
        self.height = canvas.height();
        let time = ctx.time;
        let p = &self.params;

        canvas.set_fill(BACKGROUND);
        canvas.fill_rect(0.0, 0.0, self.width, self.height);

        let layout = self.layout();
        let w = layout.cell;
        let pulse_speed = p.get_float("pulseSpeed");
        let depth_amount = p.get_float("depthAmount");
        let color_speed = p.get_float("colorSpeed");
        let rotation_speed = p.get_float("rotationSpeed");
        let line_width = p.get_float("lineWidth");
        let glow = p.get_float("glowStrength");
        let shape_scale = p.get_float("shapeScale");
        let alternate = p.get_bool("alternateRotation");
        let interactive = p.get_bool("interactive");

        for i in 0..layout.cols {
            for j in 0..layout.rows {
                let (x, y) = layout.origin(i, j);
                let offset = (i + j) as f32 * 0.5;
                let depth = (time * pulse_speed + offset).sin();
                let scale = 1.0 + depth * depth_amount;
                let neon = Rgb::from_hsl(cell_hue(time, color_speed, i, j), 100.0, 60.0);

                canvas.save();
                canvas.translate(x + w / 2.0, y + w / 2.0);
                if !interactive || self.active.contains(&(i, j)) {
                    canvas.rotate(time * rotation_speed * rotation_direction(alternate, i, j));
                }
                canvas.scale(scale, scale);
                canvas.set_line_width(self.width * line_width * scale);
                canvas.set_stroke(neon);
                canvas.set_shadow(glow * scale, neon);

                canvas.stroke_rect(-w / 2.0, -w / 2.0, w, w);
                let radius = w * shape_scale * (time * pulse_speed + offset).sin().abs();
                canvas.stroke_circle(0.0, 0.0, radius);
                canvas.restore();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_centered() {
        let l = GridLayout::new(1080.0, 1080.0, 6, 6, 0.03);
        assert!((l.cell - 135.0).abs() < 1e-4);
        assert!((l.gap - 32.4).abs() < 1e-4);
        let total = 6.0 * 135.0 + 5.0 * 32.4;
        assert!((l.start_x - (1080.0 - total) / 2.0).abs() < 1e-3);
        assert_eq!(l.start_x, l.start_y);
    }

    #[test]
    fn hue_steps_per_cell_and_wraps() {
        assert_eq!(cell_hue(0.0, 60.0, 0, 0), 0.0);
        assert!((cell_hue(2.0, 60.0, 0, 0) - 120.0).abs() < 1e-4);
        assert!((cell_hue(0.0, 60.0, 1, 2) - 75.0).abs() < 1e-4);
        // 600 + 75 + 100 = 775 -> 55
        assert!((cell_hue(10.0, 60.0, 3, 4) - 55.0).abs() < 1e-3);
        assert!((cell_hue(0.0, 10.0, 14, 14) - 340.0).abs() < 1e-4);
    }

    #[test]
    fn rotation_alternates_by_parity() {
        assert_eq!(rotation_direction(true, 0, 0), 1.0);
        assert_eq!(rotation_direction(true, 1, 0), -1.0);
        assert_eq!(rotation_direction(true, 2, 3), -1.0);
        assert_eq!(rotation_direction(true, 2, 2), 1.0);
        assert_eq!(rotation_direction(false, 1, 0), 1.0);
    }

    #[test]
    fn hit_test_excludes_edges_and_gaps() {
        let l = GridLayout::new(1080.0, 1080.0, 6, 6, 0.03);
        let (x, y) = l.origin(2, 3);
        assert_eq!(l.cell_at(x + 1.0, y + 1.0), Some((2, 3)));
        assert_eq!(l.cell_at(x, y + 1.0), None);
        assert_eq!(l.cell_at(x + l.cell + l.gap * 0.5, y + 1.0), None);
        assert_eq!(l.cell_at(0.0, 0.0), None);
    }
}
