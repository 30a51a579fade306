// crates/network/src/error.rs
//! Error types for network operations

use narrate_sync::SyncError;
use thiserror::Error;

/// Result type for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors that can occur during network operations
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Request could not be sent or the response could not be read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl NetworkError {
    /// Returns true for failures a later attempt may not hit:
    /// connection problems, timeouts and 5xx answers
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::Http(e) => !(e.is_decode() || e.is_builder() || e.is_redirect()),
            NetworkError::Status { status, .. } => *status >= 500,
            NetworkError::InvalidUrl(_) | NetworkError::Custom(_) => false,
        }
    }

    /// Returns true if the error is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(self, NetworkError::Status { status, .. } if (400..500).contains(status))
    }

    /// Returns true if the error is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        matches!(self, NetworkError::Status { status, .. } if *status >= 500)
    }

    /// Converts into a progress sync failure for `audiobook`
    pub fn into_sync_error(self, audiobook: &str) -> SyncError {
        match self {
            NetworkError::Status { .. } => SyncError::Rejected {
                audiobook: audiobook.to_string(),
                message: self.to_string(),
            },
            other => SyncError::Network(other.to_string()),
        }
    }
}
