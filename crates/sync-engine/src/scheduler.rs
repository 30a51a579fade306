// crates/sync-engine/src/scheduler.rs
//! Fixed-interval background sync

use log::debug;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Runs a tick callback every `period` on a spawned task
///
/// The first tick fires one full period after `start`. A slow tick delays
/// the following ones instead of bursting to catch up. The task is aborted
/// by `stop`, by a restart and on drop.
#[derive(Debug)]
pub struct PeriodicSync {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicSync {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            handle: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Starts ticking, replacing any running schedule. Must be called from
    /// within a tokio runtime.
    pub fn start<F, Fut>(&mut self, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();
        let period = self.period;
        debug!("Starting periodic sync every {:?}", period);

        self.handle = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick().await;
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("Stopping periodic sync");
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PeriodicSync {
    fn drop(&mut self) {
        self.stop();
    }
}
