//! Listening progress as reported to the server

use crate::types::PlaybackSpeed;
use serde::{Deserialize, Serialize};

/// Body of `POST /audiobooks/{id}/progress`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub chapter_index: usize,
    /// Whole seconds into the chapter
    pub position_seconds: u64,
    pub playback_speed: f32,
}

impl ProgressUpdate {
    /// Builds an update from a player position; fractional seconds are dropped
    pub fn new(chapter_index: usize, position: f64, speed: PlaybackSpeed) -> Self {
        let position_seconds = if position.is_finite() && position > 0.0 {
            position.floor() as u64
        } else {
            0
        };

        Self {
            chapter_index,
            position_seconds,
            playback_speed: speed.value(),
        }
    }
}
