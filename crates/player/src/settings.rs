// crates/player/src/settings.rs
//! Store tuning taken from the config file

use narrate_config::Config;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSettings {
    pub skip_forward_secs: f64,
    pub skip_backward_secs: f64,
    /// Past this point `previous_chapter` restarts the current chapter
    pub restart_threshold_secs: f64,
    pub sync_interval: Duration,
    pub sync_timeout: Duration,
}

impl PlayerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            skip_forward_secs: f64::from(config.player.skip_forward_secs),
            skip_backward_secs: f64::from(config.player.skip_backward_secs),
            restart_threshold_secs: config.player.restart_threshold_secs,
            sync_interval: config.sync.interval(),
            sync_timeout: config.sync.timeout(),
        }
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
