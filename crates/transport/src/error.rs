// FILE: crates/transport/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Failed to load {url}: {message}")]
    LoadFailed { url: String, message: String },

    #[error("Load of {url} was superseded by a newer load")]
    Superseded { url: String },

    #[error("Load generation {0} is no longer current")]
    Stale(u64),

    #[error("Audio session error: {0}")]
    Session(String),

    #[error("Native playback error: {0}")]
    Native(String),
}

impl TransportError {
    /// True when the failure only means a newer load won the race
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. } | Self::Stale(_))
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
