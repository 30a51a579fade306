//! Progress sync configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Progress reporting and API request behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between periodic progress reports while playing
    pub interval_secs: u64,

    /// Upper bound on a single progress flush
    pub timeout_secs: u64,

    /// Attempts for fetching an audiobook, including the first
    pub fetch_retries: u32,
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            timeout_secs: 10,
            fetch_retries: 3,
        }
    }
}

impl ConfigSection for SyncConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(self.interval_secs, 1, 3600, "sync.interval_secs"),
            Validator::in_range(self.timeout_secs, 1, 300, "sync.timeout_secs"),
            Validator::in_range(self.fetch_retries, 1, 10, "sync.fetch_retries"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.interval_secs = other.interval_secs;
        self.timeout_secs = other.timeout_secs;
        self.fetch_retries = other.fetch_retries;
    }

    fn section_name(&self) -> &'static str {
        "sync"
    }
}
