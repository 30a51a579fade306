//! File system persistence for configuration
//!
//! Writes go through a temp file in the same directory followed by a rename,
//! and the previous file is copied to `config.toml.backup` first.

use crate::{Config, ConfigError, ConfigResult, CONFIG_VERSION};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const DEFAULT_HEADER: &str = "\
# Narrate configuration
#
# [app]     api_base_url, api_token, log_level (error|warn|info|debug|trace)
# [player]  playback_speed (0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0), volume (0.0 - 1.0),
#           skip_forward_secs, skip_backward_secs, restart_threshold_secs
# [sync]    interval_secs, timeout_secs, fetch_retries
#
# Any field may be overridden with NARRATE_<SECTION>_<FIELD>.

";

/// Handles configuration file persistence
pub struct ConfigPersistence {
    config_path: PathBuf,
}

impl ConfigPersistence {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Loads configuration from file
    ///
    /// A missing file yields the default config. An empty or unparsable file
    /// is an error. Out-of-range values are logged but still returned, so a
    /// user can fix them without losing the rest of the file.
    pub fn load(&self) -> ConfigResult<Config> {
        if !self.config_path.exists() {
            log::info!(
                "Config file not found at {}, using defaults",
                self.config_path.display()
            );
            return Ok(Config::default());
        }

        let contents =
            fs::read_to_string(&self.config_path).map_err(|e| ConfigError::ReadError {
                path: self.config_path.clone(),
                source: e,
            })?;

        if contents.trim().is_empty() {
            return Err(ConfigError::ReadError {
                path: self.config_path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Config file is empty or contains only whitespace",
                ),
            });
        }

        let config: Config = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: self.config_path.clone(),
            source: e,
        })?;

        if config.version != CONFIG_VERSION {
            log::warn!(
                "Config version {} differs from supported version {}, reading as-is",
                config.version,
                CONFIG_VERSION
            );
        }

        if let Err(errors) = config.validate() {
            let error_msg = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            log::warn!("Config validation warnings: {}", error_msg);
        }

        Ok(config)
    }

    /// Validates and saves configuration to file atomically
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        let toml_string = self.render(config)?;
        self.write(&toml_string)?;
        log::info!("Config saved to {}", self.config_path.display());
        Ok(())
    }

    /// Writes the default config with an explanatory header
    pub fn generate_default_with_comments(&self) -> ConfigResult<()> {
        let body = self.render(&Config::default())?;
        self.write(&format!("{}{}", DEFAULT_HEADER, body))?;
        log::info!("Generated default config at {}", self.config_path.display());
        Ok(())
    }

    fn render(&self, config: &Config) -> ConfigResult<String> {
        config.validate().map_err(ConfigError::ValidationError)?;
        Ok(toml::to_string_pretty(config)?)
    }

    fn write(&self, content: &str) -> ConfigResult<()> {
        if let Some(parent) = self.config_path.parent() {
            self.ensure_directory_exists(parent)?;
        }

        if self.config_path.exists() {
            self.backup_config()?;
        }

        let temp_file = self.create_temp_file()?;
        self.write_atomic(temp_file, content)
    }

    fn ensure_directory_exists(&self, path: &Path) -> ConfigResult<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| ConfigError::DirectoryCreationError {
                path: path.to_path_buf(),
                source: e,
            })?;
            log::info!("Created config directory: {}", path.display());
        }
        Ok(())
    }

    fn backup_config(&self) -> ConfigResult<()> {
        let backup_path = self.config_path.with_extension("toml.backup");
        fs::copy(&self.config_path, &backup_path)
            .map_err(|e| ConfigError::BackupError { source: e })?;
        log::debug!("Backed up config to {}", backup_path.display());
        Ok(())
    }

    fn create_temp_file(&self) -> ConfigResult<NamedTempFile> {
        let dir = self
            .config_path
            .parent()
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Config path has no parent directory".to_string(),
            })?;

        Ok(NamedTempFile::new_in(dir)?)
    }

    fn write_atomic(&self, mut temp_file: NamedTempFile, content: &str) -> ConfigResult<()> {
        temp_file.write_all(content.as_bytes())?;
        temp_file.flush()?;

        temp_file
            .persist(&self.config_path)
            .map_err(|e| ConfigError::WriteError {
                path: self.config_path.clone(),
                source: e.error,
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrate_core::PlaybackSpeed;
    use tempfile::TempDir;

    fn setup_test_dir() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.toml");
        (temp_dir, config_path)
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let (_temp_dir, config_path) = setup_test_dir();
        let persistence = ConfigPersistence::new(config_path);

        let config = persistence.load().expect("Should load default config");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (_temp_dir, config_path) = setup_test_dir();
        let persistence = ConfigPersistence::new(config_path);

        let mut config = Config::default();
        config.player.playback_speed = PlaybackSpeed::OneAndThreeQuarters;
        config.player.volume = 0.6;

        persistence.save(&config).expect("Should save config");
        let loaded = persistence.load().expect("Should load config");

        assert_eq!(loaded.player.playback_speed, PlaybackSpeed::OneAndThreeQuarters);
        assert_eq!(loaded.player.volume, 0.6);
    }

    #[test]
    fn test_save_creates_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("subdir").join("config.toml");
        let persistence = ConfigPersistence::new(config_path.clone());

        persistence
            .save(&Config::default())
            .expect("Should create directory and save");

        assert!(config_path.exists());
    }

    #[test]
    fn test_backup_created_on_overwrite() {
        let (_temp_dir, config_path) = setup_test_dir();
        let persistence = ConfigPersistence::new(config_path.clone());

        let config = Config::default();
        persistence.save(&config).expect("Should save config");
        persistence.save(&config).expect("Should save config again");

        assert!(config_path.with_extension("toml.backup").exists());
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let (_temp_dir, config_path) = setup_test_dir();
        fs::write(&config_path, "this is not valid TOML {{{").expect("Should write file");

        let persistence = ConfigPersistence::new(config_path);
        assert!(matches!(
            persistence.load().unwrap_err(),
            ConfigError::ParseError { .. }
        ));
    }

    #[test]
    fn test_out_of_range_values_still_load() {
        let (_temp_dir, config_path) = setup_test_dir();
        fs::write(&config_path, "[player]\nvolume = 3.0\n").expect("Should write file");

        let persistence = ConfigPersistence::new(config_path);
        let loaded = persistence.load().expect("Should load with warnings");
        assert_eq!(loaded.player.volume, 3.0);
    }

    #[test]
    fn test_validate_before_save() {
        let (_temp_dir, config_path) = setup_test_dir();
        let persistence = ConfigPersistence::new(config_path.clone());

        let mut config = Config::default();
        config.player.volume = 1.5;

        assert!(matches!(
            persistence.save(&config).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
        assert!(!config_path.exists());
    }

    #[test]
    fn test_generate_default_with_comments() {
        let (_temp_dir, config_path) = setup_test_dir();
        let persistence = ConfigPersistence::new(config_path.clone());

        persistence
            .generate_default_with_comments()
            .expect("Should generate default config");

        let text = fs::read_to_string(&config_path).expect("Should read file");
        assert!(text.starts_with("# Narrate configuration"));

        let loaded = persistence.load().expect("Should load generated config");
        assert_eq!(loaded, Config::default());
    }
}
