use crate::audio::{AtomicAudioFeatures, AudioFeatures, AudioSystem};
use crate::camera::open_source;
use crate::config::{AudioSource, Config};
use crate::params::{default_params_path, ParamSet};
use crate::recorder::Recorder;
use crate::render::{make_renderer, Frame, Renderer};
use crate::terminal::TerminalGuard;
use crate::visual::{
    make_sketches, resolve_sketch_index, PointerKind, Sketch, SketchEngine, SketchInputs,
    DEFAULT_FPS,
};
use anyhow::Context;
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyOutcome {
    None,
    Quit,
    StartAudio,
    ToggleRecord,
    SaveParams,
    Layout,
}

#[derive(Debug, Clone, Copy)]
struct UiState {
    show_hud: bool,
    show_help: bool,
    show_panel: bool,
}

/// Lazily started audio: nothing is opened until the first click or `a`.
struct AudioGate {
    source: AudioSource,
    device: Option<String>,
    file: Option<PathBuf>,
    system: Option<AudioSystem>,
    features: Option<Arc<AtomicAudioFeatures>>,
    failed: bool,
}

impl AudioGate {
    fn new(cfg: &Config) -> Self {
        Self {
            source: cfg.effective_audio_source(),
            device: cfg.device.clone(),
            file: cfg.audio_file.clone(),
            system: None,
            features: None,
            failed: false,
        }
    }

    fn start(&mut self) {
        if self.system.is_some() || self.failed || self.source == AudioSource::Off {
            return;
        }
        match AudioSystem::new(self.source, self.device.as_deref(), self.file.as_deref()) {
            Ok(sys) => {
                tracing::info!(
                    source = ?self.source,
                    sample_rate = sys.sample_rate_hz,
                    "audio started"
                );
                self.features = Some(sys.features());
                self.system = Some(sys);
            }
            Err(err) => {
                tracing::warn!("audio unavailable ({:?}): {err:#}", self.source);
                self.failed = true;
            }
        }
    }

    fn running(&self) -> bool {
        self.system.is_some()
    }

    fn features(&self) -> AudioFeatures {
        self.features.as_ref().map(|f| f.load()).unwrap_or_default()
    }

    fn label(&self) -> String {
        match (self.source, self.running(), self.failed) {
            (AudioSource::Off, _, _) => "off".to_string(),
            (_, _, true) => "unavailable".to_string(),
            (src, false, _) => format!("{src:?} (click or a)"),
            (src, true, _) => format!("{src:?} {:>4.2}", self.features().level),
        }
    }
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let camera = open_source(&cfg.camera, DEFAULT_FPS as f32)
        .with_context(|| format!("open camera source '{}'", cfg.camera))?;
    let mut engine_sketches = make_sketches(SketchInputs {
        camera,
        image_a: cfg.image_a.clone(),
        image_b: cfg.image_b.clone(),
        seed: cfg.seed,
    });

    let params_path = cfg.params.clone().or_else(default_params_path);
    if let Some(path) = params_path.as_deref() {
        for sketch in &mut engine_sketches {
            let name = sketch.name();
            match sketch.params_mut().load_file(path, name) {
                Ok(0) => {}
                Ok(n) => tracing::info!(
                    sketch = name,
                    applied = n,
                    "params loaded from {}",
                    path.display()
                ),
                Err(err) => tracing::warn!(sketch = name, "params file {}: {err}", path.display()),
            }
        }
    }

    let names: Vec<&str> = engine_sketches.iter().map(|s| s.name()).collect();
    let active = resolve_sketch_index(cfg.sketch.as_deref(), &names)?;
    let mut engine = SketchEngine::new(engine_sketches, active);

    let mut audio = AudioGate::new(&cfg);
    if cfg.audio_autostart {
        audio.start();
    }

    let mut renderer = make_renderer(cfg.renderer);

    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());

    let mut last_size = crossterm::terminal::size().context("get terminal size")?;
    if last_size.1 < 2 || last_size.0 < 4 {
        return Err(anyhow::anyhow!(
            "terminal too small (need at least 4x2, got {}x{})",
            last_size.0,
            last_size.1
        ));
    }

    let mut ui = UiState {
        show_hud: true,
        show_help: false,
        show_panel: false,
    };
    let mut hud_rows = hud_rows_for_size(last_size, ui.show_hud);
    resize_engine(&mut engine, &*renderer, last_size, hud_rows);

    let mut recorder: Option<Recorder> = None;
    let mut fps = FpsCounter::new();
    let start = Instant::now();
    let mut last_frame = start;

    loop {
        let now = Instant::now();

        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    let old_hud = ui.show_hud;
                    match handle_key(k.code, k.modifiers, &mut engine, &mut ui) {
                        KeyOutcome::Quit => {
                            stop_recording(&mut recorder, "quit");
                            return Ok(());
                        }
                        KeyOutcome::StartAudio => audio.start(),
                        KeyOutcome::ToggleRecord => {
                            if recorder.is_some() {
                                stop_recording(&mut recorder, "stopped");
                            } else {
                                let (w, h) = pixel_size(&*renderer, last_size, hud_rows);
                                let fps = engine.active_settings().effective_fps(cfg.fps);
                                let sketch = engine.active_name();
                                match Recorder::start_live(&cfg.record_dir, sketch, w, h, fps) {
                                    Ok(r) => recorder = Some(r),
                                    Err(err) => tracing::warn!("recording not started: {err:#}"),
                                }
                            }
                        }
                        KeyOutcome::SaveParams => {
                            save_active_params(&engine, params_path.as_deref())
                        }
                        KeyOutcome::Layout | KeyOutcome::None => {}
                    }
                    if ui.show_hud != old_hud {
                        hud_rows = hud_rows_for_size(last_size, ui.show_hud);
                        resize_engine(&mut engine, &*renderer, last_size, hud_rows);
                    }
                }
                Event::Mouse(m) => {
                    let visual_rows = last_size.1.saturating_sub(hud_rows).max(1);
                    let cell = renderer.cell_pixels();
                    if let Some((kind, px, py)) = map_mouse(m, cell, visual_rows) {
                        if kind == PointerKind::Down {
                            audio.start();
                        }
                        engine.pointer(kind, px, py);
                    }
                }
                Event::Resize(c, r) => {
                    last_size = (c, r);
                    hud_rows = hud_rows_for_size(last_size, ui.show_hud);
                    resize_engine(&mut engine, &*renderer, last_size, hud_rows);
                }
                _ => {}
            }
        }

        // Resize events can be missed in some terminals.
        let sz = crossterm::terminal::size()?;
        if sz != last_size {
            last_size = sz;
            hud_rows = hud_rows_for_size(last_size, ui.show_hud);
            resize_engine(&mut engine, &*renderer, last_size, hud_rows);
        }

        let dt = now.duration_since(last_frame).as_secs_f32().max(1e-6);
        last_frame = now;

        let (term_cols, term_rows) = last_size;
        let hud = if ui.show_hud {
            build_wrapped_hud(
                term_cols as usize,
                &engine,
                fps.fps(),
                &audio.label(),
                recorder.as_ref().map(|r| r.out_path()),
                renderer.name(),
            )
        } else {
            String::new()
        };
        let target_hud_rows = hud_rows_for_text(term_rows, ui.show_hud, &hud);
        if target_hud_rows != hud_rows {
            hud_rows = target_hud_rows;
            resize_engine(&mut engine, &*renderer, last_size, hud_rows);
        }
        let visual_rows = term_rows.saturating_sub(hud_rows).max(1);

        let panel = if ui.show_panel {
            engine
                .active_sketch()
                .map(|s| panel_text(s.name(), s.params()))
        } else {
            None
        };
        let overlay = ui.show_help.then(help_popup_text);
        let target_fps = engine.active_settings().effective_fps(cfg.fps);

        let view = engine.render(
            now.duration_since(start).as_secs_f32(),
            dt,
            audio.features(),
            audio.running(),
            cfg.fps,
        );

        if let Some(rec) = recorder.as_mut() {
            let result = if rec.accepts(view.width, view.height) {
                rec.push_frame(view.pixels).map(|_| true)
            } else {
                Ok(false)
            };
            match result {
                Ok(true) => {}
                Ok(false) => stop_recording(&mut recorder, "frame size changed"),
                Err(err) => {
                    tracing::warn!("recording failed: {err:#}");
                    stop_recording(&mut recorder, "write error");
                }
            }
        }

        let frame = Frame {
            term_cols,
            term_rows,
            visual_rows,
            pixel_width: view.width,
            pixel_height: view.height,
            pixels_rgba: view.pixels,
            glyphs: view.glyphs,
            hud: &hud,
            hud_rows,
            panel: panel.as_deref(),
            overlay,
            sync_updates: cfg.sync_updates,
        };
        renderer.render(&frame, &mut out)?;
        fps.tick();

        let target = Duration::from_secs_f32(1.0 / target_fps.max(1) as f32);
        let elapsed = now.elapsed();
        if elapsed < target {
            std::thread::sleep(target - elapsed);
        }
    }
}

fn stop_recording(recorder: &mut Option<Recorder>, reason: &str) {
    let Some(rec) = recorder.take() else {
        return;
    };
    tracing::info!(reason, "stopping recording");
    if let Err(err) = rec.finish() {
        tracing::warn!("recording not finalized: {err:#}");
    }
}

fn save_active_params(engine: &SketchEngine, path: Option<&Path>) {
    let Some(path) = path else {
        tracing::warn!("no params file location (set --params or $HOME)");
        return;
    };
    let Some(sketch) = engine.active_sketch() else {
        return;
    };
    match sketch.params().save_file(path, sketch.name()) {
        Ok(()) => tracing::info!(sketch = sketch.name(), "params saved to {}", path.display()),
        Err(err) => tracing::warn!("save params to {}: {err}", path.display()),
    }
}

fn pixel_size(renderer: &dyn Renderer, size: (u16, u16), hud_rows: u16) -> (usize, usize) {
    let (px_w_mul, px_h_mul) = renderer.cell_pixels();
    let (cols, rows) = size;
    let visual_rows = rows.saturating_sub(hud_rows).max(1);
    (
        (cols as usize).saturating_mul(px_w_mul),
        (visual_rows as usize).saturating_mul(px_h_mul),
    )
}

fn resize_engine(
    engine: &mut SketchEngine,
    renderer: &dyn Renderer,
    size: (u16, u16),
    hud_rows: u16,
) {
    let (w, h) = pixel_size(renderer, size, hud_rows);
    engine.resize(w, h, renderer.pixel_aspect());
}

/// Terminal cell to the pixel at its center. Presses on the HUD rows are dropped,
/// releases are always delivered so a drag can end anywhere.
fn map_mouse(
    m: MouseEvent,
    cell_pixels: (usize, usize),
    visual_rows: u16,
) -> Option<(PointerKind, f32, f32)> {
    let kind = match m.kind {
        MouseEventKind::Down(MouseButton::Left) => PointerKind::Down,
        MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => PointerKind::Move,
        MouseEventKind::Up(MouseButton::Left) => PointerKind::Up,
        _ => return None,
    };
    if kind != PointerKind::Up && m.row >= visual_rows {
        return None;
    }
    let (cw, ch) = cell_pixels;
    let px = (m.column as f32 + 0.5) * cw as f32;
    let py = (m.row as f32 + 0.5) * ch as f32;
    Some((kind, px, py))
}

fn handle_key(
    code: KeyCode,
    mods: KeyModifiers,
    engine: &mut SketchEngine,
    ui: &mut UiState,
) -> KeyOutcome {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return KeyOutcome::Quit;
    }

    if ui.show_panel {
        if let Some(params) = engine.active_sketch_mut().map(|s| s.params_mut()) {
            match code {
                KeyCode::Up => {
                    params.select_prev();
                    return KeyOutcome::None;
                }
                KeyCode::Down => {
                    params.select_next();
                    return KeyOutcome::None;
                }
                KeyCode::Left => {
                    params.adjust(-1);
                    return KeyOutcome::None;
                }
                KeyCode::Right => {
                    params.adjust(1);
                    return KeyOutcome::None;
                }
                KeyCode::Enter => {
                    params.activate();
                    return KeyOutcome::None;
                }
                KeyCode::Esc => {
                    ui.show_panel = false;
                    return KeyOutcome::None;
                }
                _ => {}
            }
        }
    }

    match code {
        KeyCode::Esc if ui.show_help => {
            ui.show_help = false;
            KeyOutcome::None
        }
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => KeyOutcome::Quit,
        KeyCode::Left => {
            engine.prev_sketch();
            KeyOutcome::None
        }
        KeyCode::Right => {
            engine.next_sketch();
            KeyOutcome::None
        }
        KeyCode::Char('p') | KeyCode::Char('P') => {
            ui.show_panel = !ui.show_panel;
            if ui.show_panel {
                ui.show_help = false;
            }
            KeyOutcome::None
        }
        KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::F(1) => {
            ui.show_help = !ui.show_help;
            if ui.show_help {
                ui.show_panel = false;
            }
            KeyOutcome::None
        }
        KeyCode::Char('i') | KeyCode::Char('I') => {
            ui.show_hud = !ui.show_hud;
            KeyOutcome::Layout
        }
        KeyCode::Char('a') | KeyCode::Char('A') => KeyOutcome::StartAudio,
        KeyCode::Char('r') | KeyCode::Char('R') => KeyOutcome::ToggleRecord,
        KeyCode::Char('w') | KeyCode::Char('W') => KeyOutcome::SaveParams,
        _ => KeyOutcome::None,
    }
}

/// One row per panel parameter; the selected row starts with `>`.
fn panel_text(sketch: &str, params: &ParamSet) -> String {
    let mut lines = vec![format!("  {sketch}")];
    let selected = params.selected();
    for (i, p) in params.panel().enumerate() {
        let marker = if i == selected { '>' } else { ' ' };
        lines.push(format!("{marker} {:<18} {}", p.label, p.display_value()));
    }
    if params.panel_len() == 0 {
        lines.push("  (no parameters)".to_string());
    }
    lines.join("\n")
}

fn hud_rows_for_size(size: (u16, u16), show_hud: bool) -> u16 {
    if !show_hud {
        return 0;
    }
    let rows = size.1;
    if rows <= 1 {
        return 0;
    }
    (rows - 1).min(2)
}

fn hud_rows_for_text(term_rows: u16, show_hud: bool, hud: &str) -> u16 {
    if !show_hud {
        return 0;
    }
    let max_rows = term_rows.saturating_sub(1);
    let wanted = hud.lines().count() as u16;
    wanted.min(max_rows)
}

fn build_wrapped_hud(
    cols: usize,
    engine: &SketchEngine,
    fps: f32,
    audio_label: &str,
    recording: Option<&Path>,
    renderer_name: &str,
) -> String {
    let record = match recording {
        Some(path) => format!(
            "REC {}",
            path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        ),
        None => "off".to_string(),
    };
    let logical_lines = vec![
        format!(
            "Sketch: {} ({}/{}){} | FPS: {:>4.1} | Audio: {} | Rec: {} | Renderer: {}",
            engine.active_name(),
            engine.active_index() + 1,
            engine.len(),
            if engine.in_transition() { " ~" } else { "" },
            fps,
            audio_label,
            record,
            renderer_name,
        ),
        "Keys: ←/→ sketch | p params | w save | a audio | r record | i HUD | ? help | q quit"
            .to_string(),
    ];

    wrap_hud_lines(cols, &logical_lines).join("\n")
}

fn wrap_hud_lines(cols: usize, lines: &[String]) -> Vec<String> {
    let width = cols.max(1);
    let mut out = Vec::new();
    for line in lines {
        out.extend(hard_wrap_line(line, width));
    }
    out
}

fn hard_wrap_line(line: &str, width: usize) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

fn help_popup_text() -> &'static str {
    "TUI Sketchbook Hotkeys\n\
←/→  previous/next sketch\n\
p  show/hide the parameter panel\n\
Panel keys:\n\
  up/down  select parameter\n\
  left/right  decrease/increase\n\
  enter  toggle / cycle / run action\n\
  esc  close panel\n\
w  save the sketch's parameters\n\
a  start audio (a click also starts it)\n\
r  start/stop recording to MP4\n\
mouse  click and drag on the canvas\n\
i  show/hide HUD\n\
? or h or F1  toggle this help\n\
q or esc  quit"
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = (self.frames as f32) / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}
