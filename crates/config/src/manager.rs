//! Configuration manager - main API for config operations

use crate::persistence::ConfigPersistence;
use crate::{Config, ConfigError, ConfigResult, LogLevel};
use directories::ProjectDirs;
use narrate_core::PlaybackSpeed;
use std::path::PathBuf;

/// Main configuration manager
///
/// Owns the config file location and routes loads and saves through
/// `ConfigPersistence`.
pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a new config manager using the platform config directory
    ///
    /// - Linux: `~/.config/narrate/`
    /// - macOS: `~/Library/Application Support/narrate/`
    /// - Windows: `%APPDATA%\narrate\`
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::default_config_dir()?;
        Self::with_directory(config_dir)
    }

    /// Creates a config manager with a custom config directory
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        let config_path = config_dir.join("config.toml");
        let persistence = ConfigPersistence::new(config_path);

        Ok(Self {
            persistence,
            config_dir,
        })
    }

    fn default_config_dir() -> ConfigResult<PathBuf> {
        ProjectDirs::from("", "", "narrate")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Could not determine user config directory".to_string(),
            })
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Loads the configuration from file
    ///
    /// A missing file gives defaults; a corrupted file is an error.
    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Loads the configuration, falling back to defaults on any error
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    }

    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Loads, applies `update_fn`, and saves the result
    ///
    /// ```rust,no_run
    /// # use narrate_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| {
    ///     config.player.volume = 0.8;
    /// }).expect("Failed to update config");
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Writes a default config file if none exists
    ///
    /// Returns Ok(true) if a new file was created.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.config_path().exists() {
            log::info!(
                "Config file already exists at {}",
                self.config_path().display()
            );
            return Ok(false);
        }

        self.persistence.generate_default_with_comments()?;
        Ok(true)
    }

    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Validates the current configuration file
    ///
    /// Returns the human-readable problems, empty when the file is valid.
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Loads the file and applies `NARRATE_<SECTION>_<FIELD>` overrides
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {:?}",
                errors
            );
        }

        Ok(config)
    }
}

/// Applies environment-style overrides read through `lookup`
///
/// Unparsable values are logged and skipped, leaving the file value.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("NARRATE_APP_API_BASE_URL") {
        config.app.api_base_url = url;
    }

    if let Some(token) = lookup("NARRATE_APP_API_TOKEN") {
        config.app.api_token = Some(token).filter(|t| !t.is_empty());
    }

    if let Some(level) = lookup("NARRATE_APP_LOG_LEVEL") {
        match level.parse::<LogLevel>() {
            Ok(level) => config.app.log_level = level,
            Err(e) => log::warn!("Ignoring NARRATE_APP_LOG_LEVEL: {}", e),
        }
    }

    if let Some(speed) = lookup("NARRATE_PLAYER_PLAYBACK_SPEED") {
        match speed.parse::<f32>().ok().and_then(PlaybackSpeed::from_value) {
            Some(speed) => config.player.playback_speed = speed,
            None => log::warn!("Ignoring NARRATE_PLAYER_PLAYBACK_SPEED={}", speed),
        }
    }

    if let Some(volume) = lookup("NARRATE_PLAYER_VOLUME") {
        match volume.parse::<f32>() {
            Ok(v) => config.player.volume = v,
            Err(_) => log::warn!("Ignoring NARRATE_PLAYER_VOLUME={}", volume),
        }
    }
}
