// crates/resilience/src/error.rs
//! Error types for resilience operations

use std::time::Duration;
use thiserror::Error;

/// Result type for resilience operations
pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Errors raised by the resilience helpers themselves
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResilienceError {
    /// Operation did not finish before its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error() {
        let err = ResilienceError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("5s"));
    }
}
