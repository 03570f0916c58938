use std::path::{Path, PathBuf};

use crossterm::event::KeyCode;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub colors: ColorsConfig,
    pub keybinds: KeybindsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// GPU registry query cadence. Floored at runtime, not here, so the
    /// file round-trips unchanged.
    pub refresh_rate_ms: u64,
    /// Power profiler sampling window per tick.
    pub powermetrics_rate_ms: u64,
    /// Points kept per sparkline.
    pub sparkline_length: usize,
    /// Skip the power profiler entirely (no ANE or cluster data).
    pub disable_powermetrics: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            refresh_rate_ms: 1000,
            powermetrics_rate_ms: 1000,
            sparkline_length: 60,
            disable_powermetrics: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub theme: String,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        ColorsConfig {
            theme: "dark".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KeybindsConfig {
    pub quit: String,
    pub help: String,
    pub cycle_theme: String,
    pub pause: String,
    pub clear_history: String,
}

impl Default for KeybindsConfig {
    fn default() -> Self {
        KeybindsConfig {
            quit: "q".to_string(),
            help: "?".to_string(),
            cycle_theme: "t".to_string(),
            pause: "p".to_string(),
            clear_history: "c".to_string(),
        }
    }
}

/// "q" -> Char('q'), plus the named keys a keybind line may use.
pub fn parse_key(s: &str) -> Option<KeyCode> {
    match s {
        "Enter" => Some(KeyCode::Enter),
        "Escape" | "Esc" => Some(KeyCode::Esc),
        "Space" => Some(KeyCode::Char(' ')),
        "Tab" => Some(KeyCode::Tab),
        "Backspace" => Some(KeyCode::Backspace),
        "Delete" => Some(KeyCode::Delete),
        _ => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(KeyCode::Char(c)),
                _ => None,
            }
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("agxtop").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}
