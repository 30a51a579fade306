// crates/player/src/state.rs
//! Observable player state

use crate::preferences::Preferences;
use narrate_core::{Audiobook, Chapter, PlaybackSpeed, ProgressUpdate, SleepTimer, Timestamp};
use std::fmt;
use std::sync::Arc;

/// Coarse lifecycle tag derived from the state flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    Empty,
    Loading,
    Paused,
    Playing,
    /// Overlays a ready state while the transport waits for data
    Buffering,
    Error,
}

impl fmt::Display for PlayerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Loading => "loading",
            Self::Paused => "paused",
            Self::Playing => "playing",
            Self::Buffering => "buffering",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Everything a UI needs to render the player
///
/// The current chapter is not stored separately; `current_chapter()` reads
/// it from `audiobook` at `chapter_index`, so the two cannot drift apart.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub audiobook: Option<Arc<Audiobook>>,
    pub chapter_index: usize,

    pub is_playing: bool,
    pub is_loading: bool,
    pub is_buffering: bool,

    /// Seconds into the current chapter
    pub current_time: f64,
    /// Length of the current chapter in seconds
    pub duration: f64,

    pub playback_speed: PlaybackSpeed,
    pub volume: f32,

    pub sleep_timer: Option<SleepTimer>,
    /// Set exactly when `sleep_timer` holds a minute value
    pub sleep_timer_end_time: Option<Timestamp>,

    pub is_visible: bool,
    pub is_minimized: bool,

    pub error: Option<String>,
}

impl PlayerState {
    pub fn new(preferences: Preferences) -> Self {
        Self {
            audiobook: None,
            chapter_index: 0,
            is_playing: false,
            is_loading: false,
            is_buffering: false,
            current_time: 0.0,
            duration: 0.0,
            playback_speed: preferences.playback_speed,
            volume: preferences.volume,
            sleep_timer: None,
            sleep_timer_end_time: None,
            is_visible: false,
            is_minimized: false,
            error: None,
        }
    }

    pub fn has_audiobook(&self) -> bool {
        self.audiobook.is_some()
    }

    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.audiobook
            .as_ref()
            .and_then(|book| book.chapter(self.chapter_index))
    }

    pub fn phase(&self) -> PlayerPhase {
        if self.audiobook.is_none() {
            PlayerPhase::Empty
        } else if self.error.is_some() {
            PlayerPhase::Error
        } else if self.is_loading {
            PlayerPhase::Loading
        } else if self.is_buffering {
            PlayerPhase::Buffering
        } else if self.is_playing {
            PlayerPhase::Playing
        } else {
            PlayerPhase::Paused
        }
    }

    /// Progress body for the current position, if an audiobook is loaded
    pub fn progress_update(&self) -> Option<ProgressUpdate> {
        self.audiobook.as_ref().map(|_| {
            ProgressUpdate::new(self.chapter_index, self.current_time, self.playback_speed)
        })
    }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            playback_speed: self.playback_speed,
            volume: self.volume,
        }
    }

    /// Milliseconds left on a minute sleep timer, floored at zero
    pub fn sleep_remaining_millis(&self, now: Timestamp) -> Option<i64> {
        self.sleep_timer_end_time
            .map(|end| now.millis_until(end).max(0))
    }

    /// Clears every session field; preferences survive
    pub(crate) fn reset_session(&mut self) {
        *self = Self::new(self.preferences());
    }

    pub(crate) fn clear_sleep_timer(&mut self) {
        self.sleep_timer = None;
        self.sleep_timer_end_time = None;
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new(Preferences::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Arc<Audiobook> {
        Arc::new(Audiobook::new(
            "book-1",
            "Title",
            "Author",
            vec![
                Chapter::new("c1", 1, "One", "mem://1", 100.0),
                Chapter::new("c2", 2, "Two", "mem://2", 200.0),
            ],
        ))
    }

    #[test]
    fn test_empty_state() {
        let state = PlayerState::default();
        assert_eq!(state.phase(), PlayerPhase::Empty);
        assert!(state.current_chapter().is_none());
        assert!(state.progress_update().is_none());
    }

    #[test]
    fn test_current_chapter_follows_index() {
        let mut state = PlayerState {
            audiobook: Some(book()),
            ..PlayerState::default()
        };
        assert_eq!(state.current_chapter().map(|c| c.number), Some(1));

        state.chapter_index = 1;
        assert_eq!(state.current_chapter().map(|c| c.number), Some(2));
    }

    #[test]
    fn test_phase_precedence() {
        let mut state = PlayerState {
            audiobook: Some(book()),
            is_playing: true,
            is_buffering: true,
            is_loading: true,
            ..PlayerState::default()
        };
        assert_eq!(state.phase(), PlayerPhase::Loading);

        state.is_loading = false;
        assert_eq!(state.phase(), PlayerPhase::Buffering);

        state.is_buffering = false;
        assert_eq!(state.phase(), PlayerPhase::Playing);

        state.error = Some("boom".to_string());
        assert_eq!(state.phase(), PlayerPhase::Error);
    }

    #[test]
    fn test_reset_keeps_preferences() {
        let mut state = PlayerState {
            audiobook: Some(book()),
            chapter_index: 1,
            current_time: 12.0,
            playback_speed: PlaybackSpeed::OneAndHalf,
            volume: 0.4,
            sleep_timer: Some(SleepTimer::EndOfChapter),
            is_visible: true,
            ..PlayerState::default()
        };

        state.reset_session();

        assert!(state.audiobook.is_none());
        assert_eq!(state.chapter_index, 0);
        assert_eq!(state.current_time, 0.0);
        assert!(state.sleep_timer.is_none());
        assert!(!state.is_visible);
        assert_eq!(state.playback_speed, PlaybackSpeed::OneAndHalf);
        assert_eq!(state.volume, 0.4);
    }

    #[test]
    fn test_progress_update_uses_whole_seconds() {
        let state = PlayerState {
            audiobook: Some(book()),
            chapter_index: 1,
            current_time: 42.9,
            playback_speed: PlaybackSpeed::OneAndQuarter,
            ..PlayerState::default()
        };

        let update = state.progress_update().unwrap();
        assert_eq!(update.chapter_index, 1);
        assert_eq!(update.position_seconds, 42);
        assert_eq!(update.playback_speed, 1.25);
    }

    #[test]
    fn test_sleep_remaining() {
        let state = PlayerState {
            sleep_timer: SleepTimer::minutes(5).ok(),
            sleep_timer_end_time: Some(Timestamp::from_millis(10_000)),
            ..PlayerState::default()
        };
        assert_eq!(
            state.sleep_remaining_millis(Timestamp::from_millis(4_000)),
            Some(6_000)
        );
        assert_eq!(
            state.sleep_remaining_millis(Timestamp::from_millis(20_000)),
            Some(0)
        );
    }
}
