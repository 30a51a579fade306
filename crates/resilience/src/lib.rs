// crates/resilience/src/lib.rs
//! Resilience helpers for fault-tolerant async operations
//!
//! - Retry with exponential backoff, optionally filtered by error kind
//! - Deadline enforcement for futures
//!
//! # Example
//!
//! ```rust
//! use narrate_resilience::{RetryPolicy, Timeout};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3)
//!     .with_initial_delay(Duration::from_millis(100));
//! let timeout = Timeout::new(Duration::from_secs(10));
//! assert_eq!(policy.max_attempts(), 3);
//! assert_eq!(timeout.duration(), Duration::from_secs(10));
//! ```

mod error;
mod retry;
mod timeout;

pub use error::{ResilienceError, ResilienceResult};
pub use retry::{with_retry, with_retry_if, RetryPolicy};
pub use timeout::{with_timeout, Timeout};
