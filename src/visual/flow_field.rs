use super::math::{map_range, Noise3};
use super::{RenderCtx, Settings, Sketch};
use crate::canvas::{Canvas, LineCap};
use crate::color::{offset_hsl, Rgb};
use crate::params::ParamSet;
use std::f32::consts::PI;

const LINE_CAPS: &[&str] = &["butt", "round", "square"];

/// Grid of noise-driven strokes whose angle, width and hue follow the audio level.
pub struct FlowField {
    params: ParamSet,
    noise: Noise3,
}

impl FlowField {
    pub fn new(seed: u32) -> Self {
        let params = ParamSet::new()
            .int("cols", 20, 5, 100)
            .int("rows", 20, 5, 100)
            .float("scaleMin", 2.0, 0.0, 100.0, Some(1.0))
            .hidden()
            .float("scaleMax", 40.0, 0.0, 100.0, Some(1.0))
            .hidden()
            .float("freq", 0.002, 0.0, 0.1, Some(0.001))
            .hidden()
            .float("amp", 1.0, 0.0, 10.0, Some(0.1))
            .hidden()
            .bool("audioReactive", true)
            .float("audioStrength", 2.0, 0.0, 5.0, None)
            .color("background", Rgb::new(0, 0, 0))
            .color("foreground", Rgb::new(255, 0, 64))
            .choice("lineCap", LINE_CAPS, "round");
        Self {
            params,
            noise: Noise3::new(seed),
        }
    }

    fn audio_level(&self, ctx: &RenderCtx) -> f32 {
        if self.params.get_bool("audioReactive") && ctx.audio_running {
            ctx.audio.level
        } else {
            0.0
        }
    }
}

impl Sketch for FlowField {
    fn name(&self) -> &'static str {
        "flow-field"
    }

    fn settings(&self) -> Settings {
        Settings {
            dimensions: (1080, 1080),
            fps: Some(10),
            duration: Some(30.0),
        }
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn render(&mut self, ctx: &RenderCtx, canvas: &mut Canvas) {
        let (width, height) = (canvas.width(), canvas.height());
        let p = &self.params;

        canvas.set_fill(p.get_color("background"));
        canvas.fill_rect(0.0, 0.0, width, height);

        let audio_level = self.audio_level(ctx);

        let cols = p.get_int("cols").max(1) as usize;
        let rows = p.get_int("rows").max(1) as usize;
        let (scale_min, scale_max) = (p.get_float("scaleMin"), p.get_float("scaleMax"));
        let freq = p.get_float("freq");
        let amp = p.get_float("amp");
        let strength = p.get_float("audioStrength");
        let cap = LineCap::from_label(p.get_choice("lineCap")).unwrap_or(LineCap::Round);
        let stroke = offset_hsl(p.get_color("foreground"), audio_level * 0.3, 0.0, 0.0);

        let grid_w = width * 0.8;
        let grid_h = height * 0.8;
        let cell_w = grid_w / cols as f32;
        let cell_h = grid_h / rows as f32;
        let marg_x = (width - grid_w) * 0.5;
        let marg_y = (height - grid_h) * 0.5;

        for col in 0..cols {
            for row in 0..rows {
                let x = col as f32 * cell_w + marg_x;
                let y = row as f32 * cell_h + marg_y;

                let n = self.noise.sample(x, y, ctx.frame as f32 * 0.02, freq, 1.0);
                let angle = n * PI * amp + audio_level * 5.0;
                let scale = map_range(
                    n + audio_level * strength,
                    -1.0,
                    1.0,
                    scale_min,
                    scale_max,
                    false,
                );

                canvas.save();
                canvas.translate(x + cell_w * 0.5, y + cell_h * 0.5);
                canvas.rotate(angle);
                canvas.set_line_width(scale);
                canvas.set_line_cap(cap);
                canvas.set_stroke(stroke);
                canvas.stroke_line(cell_w * -0.4, 0.0, cell_w * 0.4, 0.0);
                canvas.restore();
            }
        }
    }
}
