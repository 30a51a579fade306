// crates/sync-engine/src/types.rs
//! Sync bookkeeping types

use chrono::{DateTime, Utc};
use narrate_core::{AudiobookId, ProgressUpdate};
use serde::{Deserialize, Serialize};

/// One accepted progress report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub audiobook: AudiobookId,
    pub update: ProgressUpdate,
}

/// Counters describing sync activity since startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    pub reports_sent: u64,
    pub reports_failed: u64,
    /// Periodic ticks skipped because the position had not changed
    pub reports_skipped: u64,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.reports_sent += 1;
        self.last_sync = Some(Utc::now());
        self.last_error = None;
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.reports_failed += 1;
        self.last_error = Some(message.into());
    }

    pub fn record_skip(&mut self) {
        self.reports_skipped += 1;
    }

    /// Returns true if at least one report has been accepted
    pub fn has_synced(&self) -> bool {
        self.last_sync.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_state_starts_empty() {
        let state = SyncState::new();
        assert_eq!(state.reports_sent, 0);
        assert!(!state.has_synced());
    }

    #[test]
    fn test_success_clears_last_error() {
        let mut state = SyncState::new();
        state.record_failure("HTTP 503");
        assert_eq!(state.last_error.as_deref(), Some("HTTP 503"));

        state.record_success();
        assert_eq!(state.reports_sent, 1);
        assert_eq!(state.reports_failed, 1);
        assert!(state.last_error.is_none());
        assert!(state.has_synced());
    }

    #[test]
    fn test_sync_state_serializes() {
        let mut state = SyncState::new();
        state.record_skip();
        let json = serde_json::to_string(&state).unwrap();
        let restored: SyncState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.reports_skipped, 1);
    }
}
