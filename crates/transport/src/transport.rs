//! Audio transport: a single-resource wrapper around a native sound backend

use crate::backend::{AudioSessionConfig, NativeStatus, Sound, SoundBackend, StatusCallback};
use crate::error::{TransportError, TransportResult};
use crate::events::{EventDispatcher, ListenerId, StatusTranslator, TransportEvent, TransportEventKind};
use log::{debug, info, warn};
use narrate_core::PlaybackSpeed;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OnceCell};

struct LoadedSound {
    sound: Box<dyn Sound>,
    url: String,
    generation: u64,
}

/// Settings applied to a freshly loaded resource before it is handed over
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cue {
    pub speed: PlaybackSpeed,
    pub volume: f32,
    pub position: f64,
    pub autoplay: bool,
}

/// Owns at most one loaded media resource at a time
///
/// Every `load` and `unload` bumps a generation counter. Status reports and
/// load completions from an older generation are dropped, so a slow load
/// can never overwrite a newer one.
pub struct AudioTransport {
    backend: Arc<dyn SoundBackend>,
    session: AudioSessionConfig,
    session_ready: OnceCell<()>,
    current: AsyncMutex<Option<LoadedSound>>,
    dispatcher: Arc<EventDispatcher>,
    generation: Arc<AtomicU64>,
}

impl AudioTransport {
    pub fn new(backend: Arc<dyn SoundBackend>) -> Self {
        Self::with_session(backend, AudioSessionConfig::default())
    }

    pub fn with_session(backend: Arc<dyn SoundBackend>, session: AudioSessionConfig) -> Self {
        Self {
            backend,
            session,
            session_ready: OnceCell::new(),
            current: AsyncMutex::new(None),
            dispatcher: Arc::new(EventDispatcher::new()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Configures the device audio session. Only the first successful call
    /// reaches the backend.
    pub async fn initialize(&self) -> TransportResult<()> {
        self.session_ready
            .get_or_try_init(|| async {
                info!("Configuring audio session: {:?}", self.session);
                self.backend.configure_session(&self.session).await
            })
            .await
            .map(|_| ())
    }

    pub fn is_initialized(&self) -> bool {
        self.session_ready.initialized()
    }

    /// Replaces the current resource with `url`, starting paused at 0
    ///
    /// Returns `Superseded` when another load or an unload started before
    /// this one finished; the loser's resource is released.
    pub async fn load(&self, url: &str) -> TransportResult<u64> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut current = self.current.lock().await;

        if let Some(previous) = current.take() {
            debug!("Releasing {} before loading {}", previous.url, url);
            if let Err(e) = previous.sound.unload().await {
                warn!("Failed to release {}: {}", previous.url, e);
            }
        }

        if !self.is_current(generation) {
            return Err(TransportError::Superseded {
                url: url.to_string(),
            });
        }

        self.dispatcher.emit(&TransportEvent::LoadStart);
        debug!("Loading {} (generation {})", url, generation);

        let sound = match self
            .backend
            .create_sound(url, self.status_callback(generation))
            .await
        {
            Ok(sound) => sound,
            Err(e) => {
                if self.is_current(generation) {
                    self.dispatcher.emit(&TransportEvent::Error(e.to_string()));
                }
                return Err(e);
            }
        };

        if !self.is_current(generation) {
            if let Err(e) = sound.unload().await {
                warn!("Failed to release superseded {}: {}", url, e);
            }
            return Err(TransportError::Superseded {
                url: url.to_string(),
            });
        }

        *current = Some(LoadedSound {
            sound,
            url: url.to_string(),
            generation,
        });
        self.dispatcher.emit(&TransportEvent::CanPlay);
        Ok(generation)
    }

    /// Applies `cue` to the resource loaded as `generation`
    ///
    /// The resource stays locked for the whole sequence, and every step
    /// first checks that no newer load or unload has started. A cue for an
    /// older generation fails with `Stale` and touches nothing.
    pub async fn cue(&self, generation: u64, cue: Cue) -> TransportResult<()> {
        let current = self.current.lock().await;
        let loaded = match current.as_ref() {
            Some(loaded) if loaded.generation == generation => loaded,
            _ => return Err(TransportError::Stale(generation)),
        };

        self.ensure_current(generation)?;
        loaded.sound.set_rate(cue.speed.value()).await?;
        self.ensure_current(generation)?;
        loaded.sound.set_volume(clamp_volume(cue.volume)).await?;
        if cue.position > 0.0 {
            self.ensure_current(generation)?;
            let status = loaded.sound.status().await?;
            let target = clamp_position(cue.position, status.duration_seconds);
            self.ensure_current(generation)?;
            loaded.sound.set_position(target).await?;
        }
        if cue.autoplay {
            self.ensure_current(generation)?;
            loaded.sound.play().await?;
        }
        Ok(())
    }

    pub async fn play(&self) -> TransportResult<()> {
        let current = self.current.lock().await;
        match current.as_ref() {
            Some(loaded) => loaded.sound.play().await,
            None => {
                debug!("play ignored: nothing loaded");
                Ok(())
            }
        }
    }

    /// Pauses playback; a resource that is already paused is left alone
    pub async fn pause(&self) -> TransportResult<()> {
        let current = self.current.lock().await;
        let Some(loaded) = current.as_ref() else {
            return Ok(());
        };
        if loaded.sound.status().await?.is_playing {
            loaded.sound.pause().await?;
        }
        Ok(())
    }

    /// Flips play/pause. Returns the new playing flag, or `None` when nothing
    /// is loaded.
    pub async fn toggle_play(&self) -> TransportResult<Option<bool>> {
        let current = self.current.lock().await;
        let Some(loaded) = current.as_ref() else {
            return Ok(None);
        };
        if loaded.sound.status().await?.is_playing {
            loaded.sound.pause().await?;
            Ok(Some(false))
        } else {
            loaded.sound.play().await?;
            Ok(Some(true))
        }
    }

    /// Seeks to an absolute position, clamped to the resource bounds.
    /// Returns the applied position, or `None` when nothing is loaded.
    pub async fn seek(&self, seconds: f64) -> TransportResult<Option<f64>> {
        let current = self.current.lock().await;
        let Some(loaded) = current.as_ref() else {
            return Ok(None);
        };
        let status = loaded.sound.status().await?;
        let target = clamp_position(seconds, status.duration_seconds);
        loaded.sound.set_position(target).await?;
        Ok(Some(target))
    }

    pub async fn seek_forward(&self, seconds: f64) -> TransportResult<Option<f64>> {
        self.seek_relative(seconds).await
    }

    pub async fn seek_backward(&self, seconds: f64) -> TransportResult<Option<f64>> {
        self.seek_relative(-seconds).await
    }

    async fn seek_relative(&self, delta: f64) -> TransportResult<Option<f64>> {
        let current = self.current.lock().await;
        let Some(loaded) = current.as_ref() else {
            return Ok(None);
        };
        let status = loaded.sound.status().await?;
        let target = clamp_position(status.position_seconds + delta, status.duration_seconds);
        loaded.sound.set_position(target).await?;
        Ok(Some(target))
    }

    pub async fn set_playback_speed(&self, speed: PlaybackSpeed) -> TransportResult<()> {
        let current = self.current.lock().await;
        match current.as_ref() {
            Some(loaded) => loaded.sound.set_rate(speed.value()).await,
            None => Ok(()),
        }
    }

    /// Applies a volume clamped to [0, 1]; returns the applied value
    pub async fn set_volume(&self, volume: f32) -> TransportResult<f32> {
        let volume = clamp_volume(volume);
        let current = self.current.lock().await;
        if let Some(loaded) = current.as_ref() {
            loaded.sound.set_volume(volume).await?;
        }
        Ok(volume)
    }

    /// Position in seconds, 0 when nothing is loaded
    pub async fn current_position(&self) -> TransportResult<f64> {
        Ok(self.status().await?.map(|s| s.position_seconds).unwrap_or(0.0))
    }

    /// Duration in seconds, 0 when nothing is loaded or it is not yet known
    pub async fn duration(&self) -> TransportResult<f64> {
        Ok(self
            .status()
            .await?
            .and_then(|s| s.duration_seconds)
            .unwrap_or(0.0))
    }

    async fn status(&self) -> TransportResult<Option<NativeStatus>> {
        let current = self.current.lock().await;
        match current.as_ref() {
            Some(loaded) => loaded.sound.status().await.map(Some),
            None => Ok(None),
        }
    }

    /// Releases the current resource and invalidates any in-flight load
    pub async fn unload(&self) -> TransportResult<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let previous = self.current.lock().await.take();
        if let Some(previous) = previous {
            debug!("Unloading {}", previous.url);
            previous.sound.unload().await?;
        }
        Ok(())
    }

    /// Whether the loaded resource is currently playing, per the backend
    pub async fn is_playing(&self) -> bool {
        match self.status().await {
            Ok(status) => status.is_some_and(|s| s.is_playing),
            Err(e) => {
                warn!("Status query failed: {}", e);
                false
            }
        }
    }

    pub async fn is_loaded(&self) -> bool {
        self.current.lock().await.is_some()
    }

    pub async fn loaded_url(&self) -> Option<String> {
        self.current.lock().await.as_ref().map(|l| l.url.clone())
    }

    pub fn on<F>(&self, kind: TransportEventKind, listener: F) -> ListenerId
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        self.dispatcher.on(kind, listener)
    }

    pub fn on_any<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        self.dispatcher.on_any(listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.dispatcher.off(id)
    }

    pub fn listener_count(&self, kind: TransportEventKind) -> usize {
        self.dispatcher.listener_count(kind)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn ensure_current(&self, generation: u64) -> TransportResult<()> {
        if self.is_current(generation) {
            Ok(())
        } else {
            debug!("Dropping cue for stale generation {}", generation);
            Err(TransportError::Stale(generation))
        }
    }

    fn status_callback(&self, generation: u64) -> StatusCallback {
        let dispatcher = Arc::clone(&self.dispatcher);
        let live_generation = Arc::clone(&self.generation);
        let translator = Mutex::new(StatusTranslator::new());

        Arc::new(move |status: NativeStatus| {
            if live_generation.load(Ordering::SeqCst) != generation {
                return;
            }
            let events = translator
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .translate(&status);
            for event in &events {
                dispatcher.emit(event);
            }
        })
    }
}

fn clamp_position(seconds: f64, duration: Option<f64>) -> f64 {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    match duration {
        Some(duration) if duration > 0.0 => seconds.min(duration),
        _ => seconds,
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return 1.0;
    }
    volume.clamp(0.0, 1.0)
}
