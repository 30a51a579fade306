// crates/sync-engine/tests/sync_tests.rs
//! Integration tests for periodic progress sync

use narrate_core::{AudiobookId, PlaybackSpeed, ProgressUpdate};
use narrate_sync::{MemoryReporter, PeriodicSync, ProgressSync};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_periodic_sync_reports_only_changes() {
    let reporter = MemoryReporter::new();
    let sync = ProgressSync::new(Arc::new(reporter.clone()), Duration::from_secs(10));
    let position = Arc::new(AtomicU64::new(0));
    let id = AudiobookId::new("book-1");

    let mut schedule = PeriodicSync::new(Duration::from_secs(5));
    {
        let sync = sync.clone();
        let position = Arc::clone(&position);
        schedule.start(move || {
            let sync = sync.clone();
            let id = id.clone();
            let seconds = position.load(Ordering::SeqCst) as f64;
            async move {
                let update = ProgressUpdate::new(0, seconds, PlaybackSpeed::Normal);
                let _ = sync.sync_if_changed(&id, update).await;
            }
        });
    }

    position.store(3, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(5_100)).await;
    assert_eq!(reporter.count(), 1);

    // Position unchanged: the next tick is skipped
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(reporter.count(), 1);
    assert_eq!(sync.state().reports_skipped, 1);

    position.store(9, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(reporter.count(), 2);
    assert_eq!(reporter.last().unwrap().update.position_seconds, 9);

    schedule.stop();
    position.store(20, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(reporter.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_report_is_not_retried() {
    let reporter = MemoryReporter::new();
    reporter.set_failing(true);
    let sync = ProgressSync::new(Arc::new(reporter.clone()), Duration::from_secs(10));
    let id = AudiobookId::new("book-1");

    let result = sync
        .flush(&id, ProgressUpdate::new(1, 30.0, PlaybackSpeed::Normal))
        .await;

    assert!(result.is_err());
    assert_eq!(reporter.attempts(), 1);
}
