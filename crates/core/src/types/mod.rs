//! Domain types for Narrate
//!
//! - `audiobook`: Audiobook and Chapter
//! - `playback`: playback speed set and sleep timer options
//! - `progress`: progress report body
//! - `common`: timestamps, formatting and the `Validator` trait

mod audiobook;
mod common;
mod playback;
mod progress;

pub use audiobook::{Audiobook, AudiobookId, Chapter};
pub use common::{format_clock, Timestamp, Validator};
pub use playback::{PlaybackSpeed, SleepTimer};
pub use progress::ProgressUpdate;
