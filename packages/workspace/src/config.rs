use folio_editor::EngineOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "folio.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Engine and persistence tuning, read from `folio.config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Quiet period before a scheduled save runs
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,

    /// Quiet period before a burst of structural changes becomes one undo entry
    #[serde(default = "default_history_debounce_ms")]
    pub history_debounce_ms: u64,

    /// Undo depth (0 = unlimited)
    #[serde(default)]
    pub max_history_levels: usize,

    #[serde(default = "default_heading_level")]
    pub default_heading_level: u8,

    #[serde(default = "default_untitled_title")]
    pub untitled_title: String,
}

fn default_save_debounce_ms() -> u64 {
    1500
}

fn default_history_debounce_ms() -> u64 {
    1000
}

fn default_heading_level() -> u8 {
    2
}

fn default_untitled_title() -> String {
    "Untitled".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: default_save_debounce_ms(),
            history_debounce_ms: default_history_debounce_ms(),
            max_history_levels: 0,
            default_heading_level: default_heading_level(),
            untitled_title: default_untitled_title(),
        }
    }
}

impl EngineConfig {
    /// Load config from a store root, falling back to defaults when absent
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join(DEFAULT_CONFIG_NAME);
        let display = config_path.display().to_string();

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn history_debounce(&self) -> Duration {
        Duration::from_millis(self.history_debounce_ms)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            default_heading_level: self.default_heading_level.clamp(1, 3),
            max_history_levels: self.max_history_levels,
            untitled_title: self.untitled_title.clone(),
        }
    }
}
