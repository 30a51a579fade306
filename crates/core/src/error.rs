//! Error types and recovery strategies for Narrate
//!
//! Errors are grouped by how the player reacts to them:
//! - **Recoverable**: best-effort work that may succeed later (progress sync)
//! - **Degraded**: the current audiobook is unplayable but the app continues
//! - **Fatal**: invalid input that no retry can fix
//!
//! Each error carries a recovery action mirroring that policy.

use std::fmt;
use thiserror::Error;

/// Recovery actions that can be taken when an error occurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Retry with exponential backoff (e.g., server temporarily unavailable)
    RetryWithBackoff,
    /// Log and move on; the operation is best-effort
    Ignore,
    /// Surface the message and let the user retry manually
    UserIntervention,
    /// Reject the input; retrying with the same value cannot succeed
    RejectInput,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetryWithBackoff => write!(f, "Retrying with backoff"),
            Self::Ignore => write!(f, "Ignoring"),
            Self::UserIntervention => write!(f, "User intervention required"),
            Self::RejectInput => write!(f, "Rejecting input"),
        }
    }
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Error can be recovered from without the user
    Recoverable,
    /// Playback degraded but app can continue
    Degraded,
    /// Input is unusable
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Domain error for Narrate
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Input Errors =====
    /// Playback speed outside the offered set
    #[error("Invalid playback speed: {value}")]
    InvalidSpeed { value: f32 },

    /// Sleep timer value outside the offered presets
    #[error("Invalid sleep timer: {value}")]
    InvalidSleepTimer { value: String },

    /// Audiobook failed validation
    #[error("Invalid audiobook {id}: {}", .reasons.join("; "))]
    InvalidAudiobook { id: String, reasons: Vec<String> },

    // ===== Playback Errors =====
    /// Media could not be loaded by the transport
    #[error("Failed to load media {url}: {message}")]
    MediaLoadFailed { url: String, message: String },

    /// Native playback operation failed
    #[error("Playback failed: {message}")]
    PlaybackFailed { message: String },

    // ===== Sync Errors =====
    /// Progress report was not accepted
    #[error("Progress sync failed for {audiobook}: {message}")]
    ProgressSyncFailed { audiobook: String, message: String },

    /// Network request failed
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ===== Generic Errors =====
    /// Generic internal error
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl AppError {
    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ProgressSyncFailed { .. } | Self::NetworkError { .. } => {
                ErrorSeverity::Recoverable
            }

            Self::MediaLoadFailed { .. }
            | Self::PlaybackFailed { .. }
            | Self::InternalError { .. } => ErrorSeverity::Degraded,

            Self::InvalidSpeed { .. }
            | Self::InvalidSleepTimer { .. }
            | Self::InvalidAudiobook { .. } => ErrorSeverity::Fatal,
        }
    }

    /// Returns the recommended recovery action for this error
    pub fn recovery_action(&self) -> RecoveryAction {
        match self {
            Self::NetworkError { .. } => RecoveryAction::RetryWithBackoff,

            // Progress reports are at-most-once; the next flush supersedes them
            Self::ProgressSyncFailed { .. } => RecoveryAction::Ignore,

            Self::MediaLoadFailed { .. }
            | Self::PlaybackFailed { .. }
            | Self::InternalError { .. } => RecoveryAction::UserIntervention,

            Self::InvalidSpeed { .. }
            | Self::InvalidSleepTimer { .. }
            | Self::InvalidAudiobook { .. } => RecoveryAction::RejectInput,
        }
    }

    /// Returns a user-friendly error message suitable for display in the UI
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidSpeed { value } => {
                format!("{}x is not an available playback speed.", value)
            }
            Self::InvalidSleepTimer { .. } => "That sleep timer is not available.".to_string(),
            Self::InvalidAudiobook { .. } => {
                "This audiobook cannot be played. Its chapter list is incomplete.".to_string()
            }
            Self::MediaLoadFailed { .. } => {
                "This chapter could not be loaded. Check your connection and select it again."
                    .to_string()
            }
            Self::PlaybackFailed { .. } => "Playback stopped unexpectedly.".to_string(),
            Self::ProgressSyncFailed { .. } => {
                "Your listening position could not be saved.".to_string()
            }
            Self::NetworkError { .. } => {
                "Cannot connect to the internet. Please check your connection.".to_string()
            }
            Self::InternalError { .. } => {
                "An unexpected error occurred. Please try again.".to_string()
            }
        }
    }

    /// Returns true if this error should be logged at ERROR level
    pub fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }

    /// Returns true if this error can be automatically retried
    pub fn is_retryable(&self) -> bool {
        self.recovery_action() == RecoveryAction::RetryWithBackoff
    }

    /// Helper to create a network error from any error type
    pub fn network<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;
