//! Narrate Configuration System
//!
//! Settings live in a single TOML file split into sections. Each section is a
//! type implementing `ConfigSection`, so it validates and merges itself.
//!
//! - **Sections**: `app` (API endpoint, logging), `player` (speed, volume,
//!   skip lengths), `sync` (progress reporting cadence)
//! - **Atomic writes**: the file is written through a temp file and renamed
//! - **Overrides**: `NARRATE_<SECTION>_<FIELD>` environment variables win
//!   over the file
//!
//! # Example
//!
//! ```rust,no_run
//! use narrate_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Volume: {}", config.player.volume);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

// Config sections
mod app_config;
mod player_config;
mod sync_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::{apply_env_overrides, ConfigManager};
pub use validation::{ConfigSection, Validator};

pub use app_config::{AppConfig, LogLevel};
pub use player_config::PlayerConfig;
pub use sync_config::SyncConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    pub app: AppConfig,

    pub player: PlayerConfig,

    pub sync: SyncConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.player.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.sync.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    ///
    /// Override chain: defaults < file < env vars < CLI args
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.player.merge(other.player);
        self.sync.merge(other.sync);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            player: PlayerConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}
