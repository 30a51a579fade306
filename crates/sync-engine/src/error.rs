// crates/sync-engine/src/error.rs
//! Error types for progress sync

use std::time::Duration;
use thiserror::Error;

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while reporting progress
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// The server answered but did not accept the report
    #[error("Progress report for {audiobook} rejected: {message}")]
    Rejected { audiobook: String, message: String },

    /// The report never reached the server
    #[error("Network error: {0}")]
    Network(String),

    /// The reporter did not answer within the flush deadline
    #[error("Progress report timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Custom(String),
}
