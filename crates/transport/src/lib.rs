//! Audio transport for Narrate
//!
//! Wraps a platform sound backend behind a single-resource API and turns
//! native status reports into events.

mod backend;
mod error;
mod events;
mod simulated;
mod transport;

pub use backend::{AudioSessionConfig, InterruptionMode, NativeStatus, Sound, SoundBackend, StatusCallback};
pub use error::{TransportError, TransportResult};
pub use events::{
    EventDispatcher, Listener, ListenerId, StatusTranslator, TransportEvent, TransportEventKind,
};
pub use simulated::{SimulatedBackend, SoundState};
pub use transport::{AudioTransport, Cue};
