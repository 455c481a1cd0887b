//! Application configuration.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/maxwm/config.json`.
//! Every field is optional; a minimal `{}` file is valid and all settings
//! fall back to their compiled-in defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "modifier": "Mod4",
//!   "step": 20,
//!   "top_band": 18,
//!   "colors": { "focus": "#5294e2" },
//!   "bindings": [
//!     { "mods": "Mod4", "key": "Return", "command": { "Launch": ["st"] } },
//!     { "mods": "Mod4|Shift", "key": "q", "command": "Quit" }
//!   ],
//!   "autostart": [["sh", "-c", "~/.config/maxwm/bar.sh"]]
//! }
//! ```
//!
//! When `bindings` is present it replaces the default table entirely.

use crate::bindings::{default_specs, BindingError, BindingSpec, BindingTable};
use crate::command::ModMask;
use crate::geometry::Bounds;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Modifier for pointer drags and for the default bindings.
    pub modifier: ModMask,
    /// Pixels per keyboard move / resize.
    pub step: i32,
    /// Height kept free at the top of the screen for a bar.
    pub top_band: i32,
    pub border_width: u32,
    /// Space left free right and below a maximized window.
    pub maximize_margin: i32,
    pub colors: Colors,
    /// Key bindings; `None` selects the defaults for `modifier`.
    pub bindings: Option<Vec<BindingSpec>>,
    /// Commands launched once at startup.
    pub autostart: Vec<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modifier: ModMask::MOD1,
            step: 15,
            top_band: 15,
            border_width: 2,
            maximize_margin: 2,
            colors: Colors::default(),
            bindings: None,
            autostart: Vec::new(),
        }
    }
}

/// Color specifications, in any form the windowing system understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Colors {
    /// Border of the focused window.
    pub focus: String,
    /// Border of every other window.
    pub unfocus: String,
    /// Status text.
    pub status: String,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            focus: "rgb:1c/1c/1c".into(),
            unfocus: "rgb:9a/cc/79".into(),
            status: "rgb:1c/1c/1c".into(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path` and validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values a JSON schema cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step < 1 {
            return Err(ConfigError(format!("step must be positive, got {}", self.step)));
        }
        if self.top_band < 0 || self.maximize_margin < 0 {
            return Err(ConfigError("top_band and maximize_margin must not be negative".into()));
        }
        if self.autostart.iter().any(Vec::is_empty) {
            return Err(ConfigError("autostart contains an empty command".into()));
        }
        self.binding_table()?;
        Ok(())
    }

    /// The binding table this configuration selects.
    pub fn binding_table(&self) -> Result<BindingTable, ConfigError> {
        let table = match &self.bindings {
            Some(specs) => BindingTable::from_specs(specs),
            None => BindingTable::from_specs(&default_specs(self.modifier)),
        };
        Ok(table?)
    }

    /// Placement bounds for a screen of the given size.
    pub fn bounds(&self, screen_width: i32, screen_height: i32) -> Bounds {
        Bounds {
            screen_width,
            screen_height,
            step: self.step,
            top_band: self.top_band,
            margin: self.maximize_margin,
        }
    }
}

/// Error from loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

impl From<BindingError> for ConfigError {
    fn from(e: BindingError) -> Self {
        ConfigError(e.to_string())
    }
}
