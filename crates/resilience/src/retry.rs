// crates/resilience/src/retry.rs
//! Retry policies with exponential backoff

use log::warn;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first attempt)
    max_attempts: usize,
    /// Delay before the first retry
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    /// Whether to spread delays by up to 25%
    use_jitter: bool,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` attempts in total.
    /// Zero is treated as a single attempt.
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            use_jitter: true,
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(1)
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Delay to wait before retry number `attempt` (1-based).
    /// Attempt 0 is the initial call and has no delay.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_millis() as f64);

        let delay = if self.use_jitter {
            // Deterministic spread in [0.75, 1.0)
            capped * (0.75 + (attempt as f64 * 0.1) % 0.25)
        } else {
            capped
        };

        Duration::from_millis(delay as u64)
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Runs `operation` until it succeeds or the policy's attempts run out.
/// Returns the last error on failure.
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    with_retry_if(policy, |_| true, operation).await
}

/// Like `with_retry`, but gives up immediately on errors for which
/// `is_retryable` returns false.
pub async fn with_retry_if<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt >= policy.max_attempts() || !is_retryable(&e) {
                    return Err(e);
                }
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    "Attempt {}/{} failed: {}; retrying in {:?}",
                    attempt,
                    policy.max_attempts(),
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
