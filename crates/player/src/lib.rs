//! Narrate player core
//!
//! `PlayerStore` owns the playback state machine for one audiobook at a
//! time: chapter sequencing, sleep timer, speed and volume preferences, and
//! progress reporting. UI layers read `PlayerState` snapshots or subscribe
//! to changes.
//!
//! # Example
//!
//! ```rust,no_run
//! use narrate_core::{Audiobook, Chapter};
//! use narrate_player::PlayerStore;
//! use narrate_transport::{AudioTransport, SimulatedBackend};
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let backend = SimulatedBackend::new().with_media("mem://ch1", 600.0);
//! let store = PlayerStore::builder(Arc::new(AudioTransport::new(Arc::new(backend)))).build();
//!
//! let book = Audiobook::new(
//!     "book-1",
//!     "Title",
//!     "Author",
//!     vec![Chapter::new("c1", 1, "Opening", "mem://ch1", 600.0)],
//! );
//! store.load_audiobook(book, 0, 0.0).await;
//! store.play().await;
//! store.drain_events().await;
//! assert!(store.snapshot().is_playing);
//! # }
//! ```

mod error;
mod preferences;
mod settings;
mod state;
mod store;

pub use error::{PlayerError, PlayerResult};
pub use preferences::{MemoryPreferences, PreferenceStore, Preferences};
pub use settings::PlayerSettings;
pub use state::{PlayerPhase, PlayerState};
pub use store::{PlayerStore, PlayerStoreBuilder};
