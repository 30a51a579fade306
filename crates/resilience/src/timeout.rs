// crates/resilience/src/timeout.rs
//! Deadlines for async operations

use crate::error::{ResilienceError, ResilienceResult};
use std::future::Future;
use std::time::Duration;

/// Runs `future`, failing with `ResilienceError::Timeout` if it has not
/// completed within `duration`. The future is dropped on timeout.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> ResilienceResult<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| ResilienceError::Timeout(duration))
}

/// Reusable deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Runs `future` under this deadline
    pub async fn run<F, T>(&self, future: F) -> ResilienceResult<T>
    where
        F: Future<Output = T>,
    {
        with_timeout(self.duration, future).await
    }
}
