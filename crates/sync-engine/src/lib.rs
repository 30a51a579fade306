// crates/sync-engine/src/lib.rs
//! Listening-progress synchronization
//!
//! - `ProgressReporter`: where reports go (HTTP, memory, nowhere)
//! - `ProgressSync`: bounded, best-effort delivery with bookkeeping
//! - `PeriodicSync`: fixed-interval background schedule
//!
//! # Example
//!
//! ```rust
//! use narrate_sync::{MemoryReporter, ProgressSync};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let reporter = MemoryReporter::new();
//! let sync = ProgressSync::new(Arc::new(reporter.clone()), Duration::from_secs(10));
//! assert_eq!(sync.state().reports_sent, 0);
//! ```

mod engine;
mod error;
mod reporter;
mod scheduler;
mod tracker;
mod types;

pub use engine::ProgressSync;
pub use error::{SyncError, SyncResult};
pub use reporter::{MemoryReporter, NoopReporter, ProgressReporter};
pub use scheduler::PeriodicSync;
pub use tracker::ProgressTracker;
pub use types::{ProgressReport, SyncState};
