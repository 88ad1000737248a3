//! Audioshelf configuration
//!
//! Settings live in a single TOML file under the platform config directory.
//! Each section implements [`ConfigSection`] for validation and merging.
//!
//! Override chain: defaults < file < `AUDIOSHELF_*` environment variables.
//!
//! # Example
//!
//! ```rust,no_run
//! use audioshelf_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("config directory");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Volume: {}", config.player.default_volume);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

mod app_config;
mod narrator_config;
mod player_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::{apply_overrides, ConfigManager, ENV_PREFIX};
pub use validation::{ConfigSection, Validator};

pub use app_config::{AppConfig, LogLevel};
pub use narrator_config::NarratorConfig;
pub use player_config::{PlayerConfig, OFFERED_RATES};

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub version: u32,

    pub app: AppConfig,

    /// Player defaults and clock timings
    pub player: PlayerConfig,

    /// AI narrator preview settings
    pub narrator: NarratorConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates every section, returning all errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.player.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.narrator.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges `other` into this config, preferring its values
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.player.merge(other.player);
        self.narrator.merge(other.narrator);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            player: PlayerConfig::default(),
            narrator: NarratorConfig::default(),
        }
    }
}
