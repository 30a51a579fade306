// crates/player/src/preferences.rs
//! Persisted listening preferences
//!
//! Speed and volume outlive any single audiobook. The store reads them once
//! at construction and writes them back whenever they change.

use crate::error::{PlayerError, PlayerResult};
use narrate_config::ConfigManager;
use narrate_core::PlaybackSpeed;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preferences {
    pub playback_speed: PlaybackSpeed,
    pub volume: f32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            playback_speed: PlaybackSpeed::Normal,
            volume: 1.0,
        }
    }
}

/// Somewhere preferences survive a restart
pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> PlayerResult<Preferences>;
    fn save(&self, preferences: &Preferences) -> PlayerResult<()>;
}

impl PreferenceStore for ConfigManager {
    fn load(&self) -> PlayerResult<Preferences> {
        let config = ConfigManager::load(self).map_err(|e| PlayerError::Preferences(e.to_string()))?;
        Ok(Preferences {
            playback_speed: config.player.playback_speed,
            volume: config.player.volume,
        })
    }

    fn save(&self, preferences: &Preferences) -> PlayerResult<()> {
        self.update(|config| {
            config.player.playback_speed = preferences.playback_speed;
            config.player.volume = preferences.volume;
        })
        .map_err(|e| PlayerError::Preferences(e.to_string()))
    }
}

/// In-memory preferences; clones share the same values
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    current: Arc<Mutex<Preferences>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryPreferences {
    pub fn new(initial: Preferences) -> Self {
        Self {
            current: Arc::new(Mutex::new(initial)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn current(&self) -> Preferences {
        *self.current.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl PreferenceStore for MemoryPreferences {
    fn load(&self) -> PlayerResult<Preferences> {
        Ok(self.current())
    }

    fn save(&self, preferences: &Preferences) -> PlayerResult<()> {
        *self.current.lock().unwrap_or_else(|p| p.into_inner()) = *preferences;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_preferences_round_trip() {
        let prefs = MemoryPreferences::default();
        let wanted = Preferences {
            playback_speed: PlaybackSpeed::OneAndHalf,
            volume: 0.3,
        };

        prefs.save(&wanted).unwrap();

        assert_eq!(prefs.load().unwrap(), wanted);
        assert_eq!(prefs.save_count(), 1);
    }

    #[test]
    fn test_config_manager_persists_preferences() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;

        assert_eq!(PreferenceStore::load(&manager)?, Preferences::default());

        PreferenceStore::save(
            &manager,
            &Preferences {
                playback_speed: PlaybackSpeed::Double,
                volume: 0.5,
            },
        )?;

        let reopened = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
        let config = reopened.load()?;
        assert_eq!(config.player.playback_speed, PlaybackSpeed::Double);
        assert_eq!(config.player.volume, 0.5);

        Ok(())
    }

    #[test]
    fn test_config_manager_rejects_out_of_range_volume() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;

        let result = PreferenceStore::save(
            &manager,
            &Preferences {
                playback_speed: PlaybackSpeed::Normal,
                volume: 4.0,
            },
        );

        assert!(matches!(result, Err(PlayerError::Preferences(_))));
        Ok(())
    }
}
