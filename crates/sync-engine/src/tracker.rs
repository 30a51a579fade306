// crates/sync-engine/src/tracker.rs
//! Last-reported position per audiobook

use narrate_core::{AudiobookId, ProgressUpdate};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Remembers what was last accepted for each audiobook so periodic syncs
/// can skip positions the server already has
#[derive(Clone, Default)]
pub struct ProgressTracker {
    reported: Arc<Mutex<HashMap<AudiobookId, ProgressUpdate>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `update` differs from the last accepted report
    pub fn is_changed(&self, audiobook: &AudiobookId, update: &ProgressUpdate) -> bool {
        self.lock().get(audiobook) != Some(update)
    }

    pub fn record(&self, audiobook: &AudiobookId, update: ProgressUpdate) {
        self.lock().insert(audiobook.clone(), update);
    }

    pub fn last_reported(&self, audiobook: &AudiobookId) -> Option<ProgressUpdate> {
        self.lock().get(audiobook).copied()
    }

    pub fn forget(&self, audiobook: &AudiobookId) {
        self.lock().remove(audiobook);
    }

    /// Number of audiobooks with a recorded position
    pub fn tracked_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<AudiobookId, ProgressUpdate>> {
        self.reported.lock().unwrap_or_else(|p| p.into_inner())
    }
}
