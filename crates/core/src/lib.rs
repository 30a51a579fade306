//! Shared domain model for the Narrate audiobook player

pub mod clock;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AppError, ErrorSeverity, RecoveryAction, Result};
pub use types::{
    format_clock, Audiobook, AudiobookId, Chapter, PlaybackSpeed, ProgressUpdate, SleepTimer,
    Timestamp, Validator,
};
