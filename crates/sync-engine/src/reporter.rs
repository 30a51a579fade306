// crates/sync-engine/src/reporter.rs
//! Progress reporting seam

use crate::error::{SyncError, SyncResult};
use crate::types::ProgressReport;
use async_trait::async_trait;
use narrate_core::{AudiobookId, ProgressUpdate};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sends a listening position to wherever progress is kept
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, audiobook: &AudiobookId, update: &ProgressUpdate) -> SyncResult<()>;
}

/// Discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

#[async_trait]
impl ProgressReporter for NoopReporter {
    async fn report(&self, _audiobook: &AudiobookId, _update: &ProgressUpdate) -> SyncResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct MemoryInner {
    reports: Mutex<Vec<ProgressReport>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

/// Keeps accepted reports in memory
///
/// Used for offline playback and as a recording double in tests. Clones
/// share the same log.
#[derive(Clone, Default)]
pub struct MemoryReporter {
    inner: Arc<MemoryInner>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every report fail until switched back
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Delays every report by `delay` before it is accepted
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.lock_delay() = delay;
    }

    pub fn reports(&self) -> Vec<ProgressReport> {
        self.lock_reports().clone()
    }

    pub fn last(&self) -> Option<ProgressReport> {
        self.lock_reports().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.lock_reports().len()
    }

    /// Reports attempted, including failed and timed-out ones
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.lock_reports().clear();
        self.inner.attempts.store(0, Ordering::SeqCst);
    }

    fn lock_reports(&self) -> std::sync::MutexGuard<'_, Vec<ProgressReport>> {
        self.inner.reports.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_delay(&self) -> std::sync::MutexGuard<'_, Option<Duration>> {
        self.inner.delay.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl ProgressReporter for MemoryReporter {
    async fn report(&self, audiobook: &AudiobookId, update: &ProgressUpdate) -> SyncResult<()> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);

        let delay = *self.lock_delay();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Rejected {
                audiobook: audiobook.to_string(),
                message: "reporter is failing".to_string(),
            });
        }

        self.lock_reports().push(ProgressReport {
            audiobook: audiobook.clone(),
            update: *update,
        });
        Ok(())
    }
}
