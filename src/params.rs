//! Live-tunable sketch parameters.
//!
//! Each sketch owns a [`ParamSet`]. The terminal panel navigates and edits it,
//! and it round-trips through a plain `key=value` text file. Keys in the file
//! may be qualified with a sketch name (`neon-grid.cols=8`); unqualified keys
//! apply to any sketch that declares them.

use crate::color::{offset_hsl, Rgb};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Int { min: i64, max: i64, step: i64 },
    Float { min: f32, max: f32, step: Option<f32> },
    Bool,
    Color,
    Choice { options: &'static [&'static str] },
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f32),
    Bool(bool),
    Color(Rgb),
    Choice(usize),
    Action,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: ParamKind,
    pub value: ParamValue,
    pub in_panel: bool,
}

impl Param {
    pub fn display_value(&self) -> String {
        match (self.value, self.kind) {
            (ParamValue::Int(v), _) => v.to_string(),
            (ParamValue::Float(v), _) => format_float(v),
            (ParamValue::Bool(v), _) => if v { "on" } else { "off" }.to_string(),
            (ParamValue::Color(c), _) => c.to_hex(),
            (ParamValue::Choice(i), ParamKind::Choice { options }) => {
                options.get(i).copied().unwrap_or("?").to_string()
            }
            (ParamValue::Choice(i), _) => i.to_string(),
            (ParamValue::Action, _) => "[enter]".to_string(),
        }
    }

    /// Value as written to a params file; `None` for actions.
    fn file_value(&self) -> Option<String> {
        match (self.value, self.kind) {
            (ParamValue::Action, _) => None,
            (ParamValue::Bool(v), _) => Some(if v { "true" } else { "false" }.to_string()),
            // Shortest text that parses back to the same f32.
            (ParamValue::Float(v), _) => Some(v.to_string()),
            _ => Some(self.display_value()),
        }
    }

    fn set_raw(&mut self, raw: &str) -> Result<(), String> {
        let raw = raw.trim();
        match self.kind {
            ParamKind::Int { min, max, .. } => {
                let v = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| format!("{} expects an integer", self.key))?;
                self.value = ParamValue::Int((v.round() as i64).clamp(min, max));
            }
            ParamKind::Float { min, max, .. } => {
                let v = raw
                    .parse::<f32>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| format!("{} expects a number", self.key))?;
                self.value = ParamValue::Float(v.clamp(min, max));
            }
            ParamKind::Bool => {
                let v = parse_bool(raw).ok_or_else(|| format!("{} must be true/false", self.key))?;
                self.value = ParamValue::Bool(v);
            }
            ParamKind::Color => {
                let c = Rgb::from_hex(raw)
                    .ok_or_else(|| format!("{} expects a #rrggbb color", self.key))?;
                self.value = ParamValue::Color(c);
            }
            ParamKind::Choice { options } => {
                let idx = options
                    .iter()
                    .position(|o| o.eq_ignore_ascii_case(raw))
                    .ok_or_else(|| format!("{} must be one of {}", self.key, options.join("/")))?;
                self.value = ParamValue::Choice(idx);
            }
            ParamKind::Action => {}
        }
        Ok(())
    }

    fn step(&mut self, dir: i32) {
        let dir = dir.signum();
        match (self.kind, self.value) {
            (ParamKind::Int { min, max, step }, ParamValue::Int(v)) => {
                let next = v.saturating_add(step.max(1) * dir as i64);
                self.value = ParamValue::Int(next.clamp(min, max));
            }
            (ParamKind::Float { min, max, step }, ParamValue::Float(v)) => {
                let step = step.unwrap_or((max - min) / 100.0);
                self.value = ParamValue::Float((v + step * dir as f32).clamp(min, max));
            }
            (ParamKind::Bool, ParamValue::Bool(v)) => self.value = ParamValue::Bool(!v),
            (ParamKind::Color, ParamValue::Color(c)) => {
                self.value = ParamValue::Color(offset_hsl(c, 10.0 * dir as f32, 0.0, 0.0));
            }
            (ParamKind::Choice { options }, ParamValue::Choice(i)) => {
                self.value = ParamValue::Choice(cycle(i, options.len(), dir));
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    Io(String),
    Parse { line: usize, message: String },
}

impl fmt::Display for ParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Parse { line, message } => write!(f, "parse error at line {line}: {message}"),
        }
    }
}

impl std::error::Error for ParamsError {}

#[derive(Debug, Clone, Default)]
pub struct ParamSet {
    params: Vec<Param>,
    selected: usize,
    fired: Vec<&'static str>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, key: &'static str, kind: ParamKind, value: ParamValue) -> Self {
        self.params.push(Param {
            key,
            label: key,
            kind,
            value,
            in_panel: true,
        });
        self
    }

    pub fn int(self, key: &'static str, value: i64, min: i64, max: i64) -> Self {
        self.push(
            key,
            ParamKind::Int { min, max, step: 1 },
            ParamValue::Int(value.clamp(min, max)),
        )
    }

    pub fn float(
        self,
        key: &'static str,
        value: f32,
        min: f32,
        max: f32,
        step: Option<f32>,
    ) -> Self {
        self.push(
            key,
            ParamKind::Float { min, max, step },
            ParamValue::Float(value.clamp(min, max)),
        )
    }

    pub fn bool(self, key: &'static str, value: bool) -> Self {
        self.push(key, ParamKind::Bool, ParamValue::Bool(value))
    }

    pub fn color(self, key: &'static str, value: Rgb) -> Self {
        self.push(key, ParamKind::Color, ParamValue::Color(value))
    }

    pub fn choice(self, key: &'static str, options: &'static [&'static str], value: &str) -> Self {
        let idx = options.iter().position(|o| *o == value).unwrap_or(0);
        self.push(key, ParamKind::Choice { options }, ParamValue::Choice(idx))
    }

    pub fn action(self, key: &'static str, label: &'static str) -> Self {
        let mut s = self.push(key, ParamKind::Action, ParamValue::Action);
        if let Some(p) = s.params.last_mut() {
            p.label = label;
        }
        s
    }

    /// Keeps the most recently added parameter out of the panel.
    pub fn hidden(mut self) -> Self {
        if let Some(p) = self.params.last_mut() {
            p.in_panel = false;
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.key == key)
    }

    pub fn get_int(&self, key: &str) -> i64 {
        match self.get(key).map(|p| p.value) {
            Some(ParamValue::Int(v)) => v,
            Some(ParamValue::Float(v)) => v.round() as i64,
            _ => 0,
        }
    }

    pub fn get_float(&self, key: &str) -> f32 {
        match self.get(key).map(|p| p.value) {
            Some(ParamValue::Float(v)) => v,
            Some(ParamValue::Int(v)) => v as f32,
            _ => 0.0,
        }
    }

    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key).map(|p| p.value), Some(ParamValue::Bool(true)))
    }

    pub fn get_color(&self, key: &str) -> Rgb {
        match self.get(key).map(|p| p.value) {
            Some(ParamValue::Color(c)) => c,
            _ => Rgb::default(),
        }
    }

    pub fn get_choice(&self, key: &str) -> &'static str {
        match self.get(key).map(|p| (p.kind, p.value)) {
            Some((ParamKind::Choice { options }, ParamValue::Choice(i))) => {
                options.get(i).copied().unwrap_or("")
            }
            _ => "",
        }
    }

    /// Sets a value from its text form, clamping numbers to the declared range.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<(), String> {
        let p = self
            .params
            .iter_mut()
            .find(|p| p.key == key)
            .ok_or_else(|| format!("unknown parameter {key}"))?;
        p.set_raw(raw)
    }

    /// Returns true once per firing of the named action.
    pub fn take_action(&mut self, key: &str) -> bool {
        match self.fired.iter().position(|k| *k == key) {
            Some(i) => {
                self.fired.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn panel(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|p| p.in_panel)
    }

    pub fn panel_len(&self) -> usize {
        self.panel().count()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self) {
        let n = self.panel_len();
        if n > 0 {
            self.selected = (self.selected + 1) % n;
        }
    }

    pub fn select_prev(&mut self) {
        let n = self.panel_len();
        if n > 0 {
            self.selected = (self.selected + n - 1) % n;
        }
    }

    fn selected_mut(&mut self) -> Option<&mut Param> {
        let idx = self.selected;
        self.params.iter_mut().filter(|p| p.in_panel).nth(idx)
    }

    /// Left/right on the selected row.
    pub fn adjust(&mut self, dir: i32) {
        if let Some(p) = self.selected_mut() {
            p.step(dir);
        }
    }

    /// Enter on the selected row: toggles bools, cycles choices, fires actions.
    pub fn activate(&mut self) {
        let Some(p) = self.selected_mut() else {
            return;
        };
        match p.kind {
            ParamKind::Bool | ParamKind::Choice { .. } => p.step(1),
            ParamKind::Action => {
                let key = p.key;
                self.fired.push(key);
            }
            _ => {}
        }
    }

    /// Applies `key=value` lines. Lines qualified for a different scope are skipped,
    /// unknown keys are ignored. Returns the number of values applied.
    ///
    /// Unqualified lines are shared by every scope; a `scope.key` line overrides
    /// them wherever it appears in the file.
    pub fn apply_text(&mut self, text: &str, scope: &str) -> Result<usize, ParamsError> {
        let mut entries = Vec::new();
        for (line_idx, raw) in text.lines().enumerate() {
            let line_no = line_idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key_raw, value_raw)) = line.split_once('=') else {
                return Err(ParamsError::Parse {
                    line: line_no,
                    message: "expected <key>=<value>".to_string(),
                });
            };
            let (scoped, key) = match split_scope(key_raw.trim()) {
                (Some(s), key) if s == scope => (true, key),
                (Some(_), _) => continue,
                (None, key) => (false, key),
            };
            entries.push((scoped, line_no, key, value_raw));
        }
        entries.sort_by_key(|e| e.0);

        let mut applied = 0usize;
        for (_, line_no, key, value_raw) in entries {
            let Some(p) = self.params.iter_mut().find(|p| p.key == key) else {
                continue;
            };
            p.set_raw(value_raw)
                .map_err(|message| ParamsError::Parse { line: line_no, message })?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Writes this set's values as `scope.key=value` lines, keeping shared lines
    /// and every line of `existing` that belongs to other scopes.
    pub fn merge_text(&self, existing: &str, scope: &str) -> String {
        let mut out = String::new();
        for raw in existing.lines() {
            let line = raw.trim();
            let keep = match line.split_once('=') {
                _ if line.is_empty() || line.starts_with('#') => !line.is_empty(),
                Some((k, _)) => match split_scope(k.trim()) {
                    (Some(s), _) => s != scope,
                    (None, _) => true,
                },
                None => true,
            };
            if keep {
                out.push_str(raw);
                out.push('\n');
            }
        }
        for p in &self.params {
            if let Some(v) = p.file_value() {
                out.push_str(&format!("{scope}.{}={v}\n", p.key));
            }
        }
        out
    }

    pub fn load_file(&mut self, path: &Path, scope: &str) -> Result<usize, ParamsError> {
        let text = match std::fs::read_to_string(path) {
            Ok(v) => v,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(ParamsError::Io(err.to_string())),
        };
        self.apply_text(&text, scope)
    }

    pub fn save_file(&self, path: &Path, scope: &str) -> Result<(), ParamsError> {
        let existing = match std::fs::read_to_string(path) {
            Ok(v) => v,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                "# tui_sketchbook params v1\n".to_string()
            }
            Err(err) => return Err(ParamsError::Io(err.to_string())),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ParamsError::Io(e.to_string()))?;
        }
        let body = self.merge_text(&existing, scope);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &body).map_err(|e| ParamsError::Io(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| ParamsError::Io(e.to_string()))
    }
}

/// `$XDG_CONFIG_HOME/tui_sketchbook/params.txt`, falling back to `~/.config`.
pub fn default_params_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.trim().is_empty() {
            return Some(PathBuf::from(xdg).join("tui_sketchbook").join("params.txt"));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("tui_sketchbook")
            .join("params.txt"),
    )
}

fn split_scope(key: &str) -> (Option<&str>, &str) {
    match key.split_once('.') {
        Some((scope, rest)) => (Some(scope.trim()), rest.trim()),
        None => (None, key),
    }
}

fn cycle(i: usize, len: usize, dir: i32) -> usize {
    if len == 0 {
        return 0;
    }
    if dir < 0 {
        (i + len - 1) % len
    } else {
        (i + 1) % len
    }
}

fn format_float(v: f32) -> String {
    let s = format!("{v:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
