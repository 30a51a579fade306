// crates/player/src/error.rs
//! Error types for the player store

use narrate_transport::TransportError;
use thiserror::Error;

/// Failures inside store transitions
///
/// Transitions never hand these to the caller; they end up as the message
/// in `PlayerState::error`. Preference failures are only logged.
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Invalid audiobook {id}: {reasons}")]
    InvalidAudiobook { id: String, reasons: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to persist preferences: {0}")]
    Preferences(String),
}

pub type PlayerResult<T> = Result<T, PlayerError>;
