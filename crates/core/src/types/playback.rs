//! Playback-related domain models

use crate::error::AppError;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Playback speed, restricted to the fixed set offered by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub enum PlaybackSpeed {
    Half,
    ThreeQuarters,
    #[default]
    Normal,
    OneAndQuarter,
    OneAndHalf,
    OneAndThreeQuarters,
    Double,
}

impl PlaybackSpeed {
    /// Every selectable speed, slowest first
    pub const ALL: [PlaybackSpeed; 7] = [
        PlaybackSpeed::Half,
        PlaybackSpeed::ThreeQuarters,
        PlaybackSpeed::Normal,
        PlaybackSpeed::OneAndQuarter,
        PlaybackSpeed::OneAndHalf,
        PlaybackSpeed::OneAndThreeQuarters,
        PlaybackSpeed::Double,
    ];

    /// Rate multiplier handed to the transport
    pub fn value(&self) -> f32 {
        match self {
            Self::Half => 0.5,
            Self::ThreeQuarters => 0.75,
            Self::Normal => 1.0,
            Self::OneAndQuarter => 1.25,
            Self::OneAndHalf => 1.5,
            Self::OneAndThreeQuarters => 1.75,
            Self::Double => 2.0,
        }
    }

    /// Looks up the speed matching `value`, if it is one of the offered rates
    pub fn from_value(value: f32) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|speed| (speed.value() - value).abs() < 0.001)
    }

    /// Next faster speed, wrapping around to the slowest
    pub fn next(&self) -> Self {
        let index = Self::ALL.iter().position(|s| s == self).unwrap_or(2);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// Returns true for 1.0x
    pub fn is_normal(&self) -> bool {
        *self == Self::Normal
    }
}

impl TryFrom<f32> for PlaybackSpeed {
    type Error = AppError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or(AppError::InvalidSpeed { value })
    }
}

impl From<PlaybackSpeed> for f32 {
    fn from(speed: PlaybackSpeed) -> Self {
        speed.value()
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.value())
    }
}

/// Sleep timer selection
///
/// A minute value stops playback at a wall-clock deadline; `EndOfChapter`
/// stops playback when the current chapter finishes and has no deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SleepTimerRepr", into = "SleepTimerRepr")]
pub enum SleepTimer {
    Minutes(u32),
    EndOfChapter,
}

impl SleepTimer {
    /// Minute values offered by the player
    pub const PRESET_MINUTES: [u32; 6] = [5, 10, 15, 30, 45, 60];

    /// Wire and config spelling of the end-of-chapter sentinel
    pub const END_OF_CHAPTER: &'static str = "end_of_chapter";

    /// Creates a minute timer, rejecting values outside the preset list
    pub fn minutes(minutes: u32) -> Result<Self, AppError> {
        if Self::PRESET_MINUTES.contains(&minutes) {
            Ok(Self::Minutes(minutes))
        } else {
            Err(AppError::InvalidSleepTimer {
                value: minutes.to_string(),
            })
        }
    }

    /// Absolute deadline for a timer armed at `now`; `None` for end-of-chapter
    pub fn deadline_from(&self, now: Timestamp) -> Option<Timestamp> {
        match self {
            Self::Minutes(minutes) => Some(now.plus_millis(i64::from(*minutes) * 60_000)),
            Self::EndOfChapter => None,
        }
    }

    /// Returns true for the end-of-chapter sentinel
    pub fn is_end_of_chapter(&self) -> bool {
        matches!(self, Self::EndOfChapter)
    }
}

impl std::str::FromStr for SleepTimer {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(Self::END_OF_CHAPTER) || trimmed == "eoc" {
            return Ok(Self::EndOfChapter);
        }
        trimmed
            .parse::<u32>()
            .map_err(|_| AppError::InvalidSleepTimer {
                value: trimmed.to_string(),
            })
            .and_then(Self::minutes)
    }
}

impl fmt::Display for SleepTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(minutes) => write!(f, "{} min", minutes),
            Self::EndOfChapter => write!(f, "end of chapter"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum SleepTimerRepr {
    Minutes(u32),
    Sentinel(String),
}

impl TryFrom<SleepTimerRepr> for SleepTimer {
    type Error = AppError;

    fn try_from(repr: SleepTimerRepr) -> Result<Self, Self::Error> {
        match repr {
            SleepTimerRepr::Minutes(minutes) => Self::minutes(minutes),
            SleepTimerRepr::Sentinel(s) => s.parse(),
        }
    }
}

impl From<SleepTimer> for SleepTimerRepr {
    fn from(timer: SleepTimer) -> Self {
        match timer {
            SleepTimer::Minutes(minutes) => SleepTimerRepr::Minutes(minutes),
            SleepTimer::EndOfChapter => {
                SleepTimerRepr::Sentinel(SleepTimer::END_OF_CHAPTER.to_string())
            }
        }
    }
}
