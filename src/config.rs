// src/config.rs

//! Configuration for display mode discovery.
//!
//! Settings come from three layers, each overriding the previous one:
//! built-in defaults, an optional JSON file named by `X11_MODES_CONFIG`,
//! and the individual `X11_MODES_*` environment hints.

use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Names a JSON file to load settings from.
pub const CONFIG_PATH_ENV: &str = "X11_MODES_CONFIG";
pub const XRANDR_HINT: &str = "X11_MODES_XRANDR";
pub const XRANDR_REQUIRED_HINT: &str = "X11_MODES_XRANDR_REQUIRED";
pub const XINERAMA_HINT: &str = "X11_MODES_XINERAMA";
pub const XVIDMODE_HINT: &str = "X11_MODES_XVIDMODE";

/// Process-wide configuration, resolved from the environment on first use.
pub static CONFIG: Lazy<Config> = Lazy::new(|| match Config::from_env() {
    Ok(config) => config,
    Err(e) => {
        warn!("Ignoring invalid configuration: {:#}", e);
        Config::default()
    }
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Which mode-setting extensions may be used.
    pub extensions: ExtensionsConfig,
    /// Timing of mode changes made on window focus.
    pub mode_switch: ModeSwitchConfig,
}

/// Per-extension enable switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    pub xrandr: bool,
    /// Fail initialization instead of falling back when RandR is unusable.
    pub xrandr_required: bool,
    pub xinerama: bool,
    /// Off by default: VidMode switches are slow and disturb other clients.
    pub xvidmode: bool,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        ExtensionsConfig {
            xrandr: true,
            xrandr_required: false,
            xinerama: true,
            xvidmode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeSwitchConfig {
    /// Window manager focus debounce window.
    pub focus_debounce_ms: u64,
    /// Multiplier applied to the debounce window for the change deadline.
    pub debounce_factor: u32,
}

impl Default for ModeSwitchConfig {
    fn default() -> Self {
        ModeSwitchConfig {
            focus_debounce_ms: 200,
            debounce_factor: 2,
        }
    }
}

impl ModeSwitchConfig {
    /// How long after a mode change focus events are still attributed to it.
    pub fn change_window(&self) -> Duration {
        Duration::from_millis(self.focus_debounce_ms) * self.debounce_factor
    }
}

impl Config {
    /// Defaults, then the JSON file, then the individual hints.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_hints(|name| std::env::var(name).ok());
        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    /// Reads a JSON configuration file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Overrides extension switches from hint values. Unset or unparsable
    /// hints leave the current value alone.
    pub fn apply_hints(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let ext = &mut self.extensions;
        for (hint, slot) in [
            (XRANDR_HINT, &mut ext.xrandr),
            (XRANDR_REQUIRED_HINT, &mut ext.xrandr_required),
            (XINERAMA_HINT, &mut ext.xinerama),
            (XVIDMODE_HINT, &mut ext.xvidmode),
        ] {
            let Some(raw) = lookup(hint) else { continue };
            match parse_hint(&raw) {
                Some(value) => *slot = value,
                None => warn!("Ignoring {}={:?}: expected a boolean", hint, raw),
            }
        }
    }
}

/// Parses a boolean hint value.
pub fn parse_hint(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
