use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::data::{ParamField, SliderValues};
use crate::engine::Backend;

/// All application settings, loaded from INI file or defaults.
/// Every field here is saveable/loadable.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    // ── Parameters (initial slider positions) ──
    pub h: f64,
    pub omega_b: f64,
    pub omega_cdm: f64,
    pub n_s: f64,
    pub a_s_1e9: f64,

    // ── Engine ──
    pub backend: String, // "analytic" or "class"
    pub class_executable: String,

    // ── Update ──
    /// Quiet period before a change without a slider release counts as settled
    pub settle_ms: u64,

    // ── Window ──
    pub window_width: i32,
    pub window_height: i32,

    // ── UI ──
    pub show_tooltips: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let values = SliderValues::default();
        Self {
            h: values.h,
            omega_b: values.omega_b,
            omega_cdm: values.omega_cdm,
            n_s: values.n_s,
            a_s_1e9: values.a_s_1e9,

            backend: "analytic".to_string(),
            class_executable: "class".to_string(),

            settle_ms: 250,

            window_width: 1100,
            window_height: 720,

            show_tooltips: true,
        }
    }
}

impl Settings {
    pub const FILE_NAME: &'static str = "cmb_explorer.ini";

    pub fn default_path() -> PathBuf {
        PathBuf::from(Self::FILE_NAME)
    }

    /// Load settings from INI file, or create it with defaults if it doesn't exist.
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            match Self::load(path) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("{:#}. Using defaults.", e);
                    Self::default()
                }
            }
        } else {
            let settings = Self::default();
            match settings.save(path) {
                Ok(()) => info!(path = %path.display(), "wrote default settings"),
                Err(e) => warn!("{:#}", e),
            }
            settings
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let mut settings = Self::default();
        settings.parse_ini(&content);
        Ok(settings)
    }

    /// Save current settings to INI file.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_ini())
            .with_context(|| format!("Could not save {}", path.display()))
    }

    pub fn slider_values(&self) -> SliderValues {
        SliderValues {
            h: self.h,
            omega_b: self.omega_b,
            omega_cdm: self.omega_cdm,
            n_s: self.n_s,
            a_s_1e9: self.a_s_1e9,
        }
    }

    /// Store the current slider positions (for Save As Default).
    pub fn set_slider_values(&mut self, values: &SliderValues) {
        self.h = values.h;
        self.omega_b = values.omega_b;
        self.omega_cdm = values.omega_cdm;
        self.n_s = values.n_s;
        self.a_s_1e9 = values.a_s_1e9;
    }

    /// Engine backend; unknown names fall back to the analytic engine.
    pub fn backend(&self) -> Backend {
        match self.backend.trim().to_ascii_lowercase().as_str() {
            "class" => Backend::Class {
                executable: PathBuf::from(&self.class_executable),
            },
            "analytic" => Backend::Analytic,
            other => {
                warn!(backend = other, "unknown engine backend, using analytic");
                Backend::Analytic
            }
        }
    }

    fn to_ini(&self) -> String {
        let mut s = String::new();
        s.push_str("# cmb-explorer Settings\n");
        s.push_str("# Edit values below. Delete this file to reset to defaults.\n\n");

        s.push_str("[Parameters]\n");
        s.push_str("# Initial slider positions (A_s is given times 1e9)\n");
        s.push_str(&format!("h = {}\n", self.h));
        s.push_str(&format!("omega_b = {}\n", self.omega_b));
        s.push_str(&format!("omega_cdm = {}\n", self.omega_cdm));
        s.push_str(&format!("n_s = {}\n", self.n_s));
        s.push_str(&format!("a_s_1e9 = {}\n", self.a_s_1e9));
        s.push('\n');

        s.push_str("[Engine]\n");
        s.push_str("# backend: analytic (built in) or class (external CLASS executable)\n");
        s.push_str(&format!("backend = {}\n", self.backend));
        s.push_str(&format!("class_executable = {}\n", self.class_executable));
        s.push('\n');

        s.push_str("[Update]\n");
        s.push_str("# settle_ms: idle time before a keyboard change triggers a recompute\n");
        s.push_str(&format!("settle_ms = {}\n", self.settle_ms));
        s.push('\n');

        s.push_str("[Window]\n");
        s.push_str(&format!("window_width = {}\n", self.window_width));
        s.push_str(&format!("window_height = {}\n", self.window_height));
        s.push('\n');

        s.push_str("[UI]\n");
        s.push_str(&format!("show_tooltips = {}\n", self.show_tooltips));

        s
    }

    fn parse_ini(&mut self, content: &str) {
        let map = parse_ini_to_map(content);

        // Parameters
        for field in ParamField::ALL {
            let key = match field {
                ParamField::AS1e9 => "a_s_1e9",
                _ => field.spec().key,
            };
            if let Some(v) = map.get(key) {
                match v.parse::<f64>() {
                    Ok(n) if n.is_finite() => self.set_param(field, n),
                    _ => warn!(key, value = %v, "ignoring unreadable setting"),
                }
            }
        }

        // Engine
        if let Some(v) = map.get("backend") {
            self.backend = v.clone();
        }
        if let Some(v) = map.get("class_executable") {
            self.class_executable = v.clone();
        }

        // Update
        if let Some(v) = map.get("settle_ms") {
            if let Ok(n) = v.parse() {
                self.settle_ms = n;
            }
        }

        // Window
        if let Some(v) = map.get("window_width") {
            if let Ok(n) = v.parse() {
                self.window_width = n;
            }
        }
        if let Some(v) = map.get("window_height") {
            if let Ok(n) = v.parse() {
                self.window_height = n;
            }
        }

        // UI
        if let Some(v) = map.get("show_tooltips") {
            self.show_tooltips = v == "true";
        }
    }

    fn set_param(&mut self, field: ParamField, value: f64) {
        let mut values = self.slider_values();
        values.set(field, value);
        self.set_slider_values(&values);
    }
}

/// Parse INI content into a flat key-value map (section headers are ignored,
/// keys are globally unique in our format).
fn parse_ini_to_map(content: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
            continue;
        }
        if let Some((key, val)) = line.split_once('=') {
            let key = key.trim().to_string();
            let val = val.trim().to_string();
            map.insert(key, val);
        }
    }
    map
}
