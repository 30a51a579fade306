//! Player configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use narrate_core::PlaybackSpeed;
use serde::{Deserialize, Serialize};

/// Listening preferences and navigation behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Last selected speed; restricted to the offered speeds
    pub playback_speed: PlaybackSpeed,

    /// Output volume (0.0 - 1.0)
    pub volume: f32,

    pub skip_forward_secs: u32,

    pub skip_backward_secs: u32,

    /// How far into a chapter "previous" restarts it instead of going back
    pub restart_threshold_secs: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            playback_speed: PlaybackSpeed::Normal,
            volume: 1.0,
            skip_forward_secs: 30,
            skip_backward_secs: 15,
            restart_threshold_secs: 3.0,
        }
    }
}

impl ConfigSection for PlayerConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(self.volume, 0.0, 1.0, "player.volume"),
            Validator::in_range(self.skip_forward_secs, 1, 600, "player.skip_forward_secs"),
            Validator::in_range(self.skip_backward_secs, 1, 600, "player.skip_backward_secs"),
            Validator::in_range(
                self.restart_threshold_secs,
                0.0,
                60.0,
                "player.restart_threshold_secs",
            ),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.playback_speed = other.playback_speed;
        self.volume = other.volume;
        self.skip_forward_secs = other.skip_forward_secs;
        self.skip_backward_secs = other.skip_backward_secs;
        self.restart_threshold_secs = other.restart_threshold_secs;
    }

    fn section_name(&self) -> &'static str {
        "player"
    }
}
