// crates/sync-engine/src/engine.rs
//! Progress sync coordinator

use crate::error::{SyncError, SyncResult};
use crate::reporter::ProgressReporter;
use crate::tracker::ProgressTracker;
use crate::types::SyncState;
use log::{debug, warn};
use narrate_core::{AudiobookId, ProgressUpdate};
use narrate_resilience::Timeout;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Sends progress through a reporter, bounded by a deadline
///
/// Reports are best-effort and at-most-once: a failed or timed-out report
/// is logged, counted and dropped.
#[derive(Clone)]
pub struct ProgressSync {
    reporter: Arc<dyn ProgressReporter>,
    tracker: ProgressTracker,
    state: Arc<Mutex<SyncState>>,
    timeout: Timeout,
}

impl ProgressSync {
    pub fn new(reporter: Arc<dyn ProgressReporter>, timeout: Duration) -> Self {
        Self {
            reporter,
            tracker: ProgressTracker::new(),
            state: Arc::new(Mutex::new(SyncState::new())),
            timeout: Timeout::new(timeout),
        }
    }

    /// Reports `update` unconditionally
    pub async fn flush(&self, audiobook: &AudiobookId, update: ProgressUpdate) -> SyncResult<()> {
        debug!(
            "Reporting {} chapter {} at {}s",
            audiobook, update.chapter_index, update.position_seconds
        );

        let outcome = match self
            .timeout
            .run(self.reporter.report(audiobook, &update))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(self.timeout.duration())),
        };

        match &outcome {
            Ok(()) => {
                self.tracker.record(audiobook, update);
                self.lock_state().record_success();
            }
            Err(e) => {
                warn!("Progress sync for {} failed: {}", audiobook, e);
                self.lock_state().record_failure(e.to_string());
            }
        }
        outcome
    }

    /// Reports `update` only if it differs from the last accepted report.
    /// Returns whether a report was sent.
    pub async fn sync_if_changed(
        &self,
        audiobook: &AudiobookId,
        update: ProgressUpdate,
    ) -> SyncResult<bool> {
        if !self.tracker.is_changed(audiobook, &update) {
            self.lock_state().record_skip();
            return Ok(false);
        }
        self.flush(audiobook, update).await.map(|_| true)
    }

    pub fn state(&self) -> SyncState {
        self.lock_state().clone()
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn timeout(&self) -> Duration {
        self.timeout.duration()
    }

    fn lock_state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}
