//! Transport events and listener registry

use crate::backend::NativeStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Events emitted by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransportEvent {
    LoadStart,
    CanPlay,
    Play,
    Pause,
    Ended,
    Buffering,
    TimeUpdate { current_time: f64, duration: f64 },
    Error(String),
}

impl TransportEvent {
    pub fn kind(&self) -> TransportEventKind {
        match self {
            Self::LoadStart => TransportEventKind::LoadStart,
            Self::CanPlay => TransportEventKind::CanPlay,
            Self::Play => TransportEventKind::Play,
            Self::Pause => TransportEventKind::Pause,
            Self::Ended => TransportEventKind::Ended,
            Self::Buffering => TransportEventKind::Buffering,
            Self::TimeUpdate { .. } => TransportEventKind::TimeUpdate,
            Self::Error(_) => TransportEventKind::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportEventKind {
    LoadStart,
    CanPlay,
    Play,
    Pause,
    Ended,
    Buffering,
    TimeUpdate,
    Error,
}

impl TransportEventKind {
    pub const ALL: [TransportEventKind; 8] = [
        Self::LoadStart,
        Self::CanPlay,
        Self::Play,
        Self::Pause,
        Self::Ended,
        Self::Buffering,
        Self::TimeUpdate,
        Self::Error,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadStart => "loadstart",
            Self::CanPlay => "canplay",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Ended => "ended",
            Self::Buffering => "buffering",
            Self::TimeUpdate => "timeupdate",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TransportEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransportEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("Unknown transport event: {}", s))
    }
}

/// Handle returned by `EventDispatcher::on`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&TransportEvent) + Send + Sync>;

type Registry = HashMap<TransportEventKind, Vec<(ListenerId, Listener)>>;

/// Fan-out of transport events to subscribed listeners
///
/// Listeners are invoked outside the registry lock, so a listener may
/// subscribe or unsubscribe while handling an event.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: Mutex<Registry>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to one event kind
    pub fn on<F>(&self, kind: TransportEventKind, listener: F) -> ListenerId
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        self.register(&[kind], Arc::new(listener))
    }

    /// Subscribes to every event kind under a single id
    pub fn on_any<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        self.register(&TransportEventKind::ALL, Arc::new(listener))
    }

    /// Removes a listener from every kind it was registered for.
    /// Returns false when the id was unknown.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let mut removed = false;
        for entries in listeners.values_mut() {
            let before = entries.len();
            entries.retain(|(entry_id, _)| *entry_id != id);
            removed |= entries.len() != before;
        }
        removed
    }

    pub fn emit(&self, event: &TransportEvent) {
        let targets: Vec<Listener> = self
            .lock()
            .get(&event.kind())
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        for listener in targets {
            listener(event);
        }
    }

    pub fn listener_count(&self, kind: TransportEventKind) -> usize {
        self.lock().get(&kind).map(Vec::len).unwrap_or(0)
    }

    fn register(&self, kinds: &[TransportEventKind], listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.lock();
        for kind in kinds {
            listeners
                .entry(*kind)
                .or_default()
                .push((id, Arc::clone(&listener)));
        }
        id
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A panicking listener never holds this lock, so the map is intact
        self.listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Turns the stream of native statuses for one sound into transport events
///
/// Play and pause are edge-triggered: they fire only when the playing flag
/// changes between consecutive statuses. Time updates fire on every loaded
/// status.
#[derive(Debug, Default)]
pub struct StatusTranslator {
    was_playing: Option<bool>,
}

impl StatusTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(&mut self, status: &NativeStatus) -> Vec<TransportEvent> {
        let mut events = Vec::new();

        if let Some(message) = &status.error {
            events.push(TransportEvent::Error(message.clone()));
            return events;
        }
        if !status.is_loaded {
            return events;
        }

        events.push(TransportEvent::TimeUpdate {
            current_time: status.position_seconds,
            duration: status.duration_seconds.unwrap_or(0.0),
        });

        if status.is_buffering && !status.is_playing {
            events.push(TransportEvent::Buffering);
        }

        if status.is_playing {
            if self.was_playing != Some(true) {
                events.push(TransportEvent::Play);
            }
        } else if !status.did_just_finish && self.was_playing != Some(false) {
            events.push(TransportEvent::Pause);
        }

        if status.did_just_finish {
            events.push(TransportEvent::Ended);
        }

        self.was_playing = Some(status.is_playing);
        events
    }
}
