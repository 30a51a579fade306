//! In-process sound backend driven by an explicit clock
//!
//! Used by the CLI's `--simulate` mode and by tests. Media is registered by
//! URL with a fixed duration; time only moves through `advance` (or the
//! optional ticker), and every state change reports a status the way a
//! native engine would.

use crate::backend::{AudioSessionConfig, NativeStatus, Sound, SoundBackend, StatusCallback};
use crate::error::{TransportError, TransportResult};
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
enum Media {
    Playable { duration: f64 },
    Broken { message: String },
}

/// Snapshot of one simulated sound
#[derive(Debug, Clone, PartialEq)]
pub struct SoundState {
    pub url: String,
    pub position: f64,
    pub duration: f64,
    pub rate: f32,
    pub volume: f32,
    pub playing: bool,
    pub buffering: bool,
    pub unloaded: bool,
}

impl SoundState {
    fn new(url: &str, duration: f64) -> Self {
        Self {
            url: url.to_string(),
            position: 0.0,
            duration,
            rate: 1.0,
            volume: 1.0,
            playing: false,
            buffering: false,
            unloaded: false,
        }
    }

    fn status(&self, just_finished: bool) -> NativeStatus {
        NativeStatus {
            is_loaded: !self.unloaded,
            is_playing: self.playing,
            is_buffering: self.buffering,
            did_just_finish: just_finished,
            position_seconds: self.position,
            duration_seconds: Some(self.duration),
            error: None,
        }
    }
}

struct SimSound {
    state: Mutex<SoundState>,
    on_status: StatusCallback,
    rate_delay: Option<Duration>,
}

impl SimSound {
    fn lock(&self) -> MutexGuard<'_, SoundState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Applies `change` and reports the resulting status, unless unloaded
    fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut SoundState) -> bool,
    {
        let status = {
            let mut state = self.lock();
            if state.unloaded {
                return;
            }
            let just_finished = change(&mut state);
            state.status(just_finished)
        };
        (self.on_status)(status);
    }

    fn advance(&self, elapsed: f64) {
        self.update(|state| {
            if !state.playing || state.buffering {
                return false;
            }
            state.position += elapsed * f64::from(state.rate);
            if state.position >= state.duration {
                state.position = state.duration;
                state.playing = false;
                return true;
            }
            false
        });
    }
}

#[derive(Default)]
struct Registry {
    media: HashMap<String, Media>,
    delays: HashMap<String, Duration>,
    rate_delays: HashMap<String, Duration>,
    sounds: Vec<Arc<SimSound>>,
}

/// Deterministic stand-in for a native sound engine
#[derive(Clone, Default)]
pub struct SimulatedBackend {
    registry: Arc<Mutex<Registry>>,
    session_configurations: Arc<AtomicUsize>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a playable resource
    pub fn with_media(self, url: impl Into<String>, duration: f64) -> Self {
        self.lock()
            .media
            .insert(url.into(), Media::Playable { duration });
        self
    }

    /// Registers a resource whose load always fails
    pub fn with_broken_media(self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.lock().media.insert(
            url.into(),
            Media::Broken {
                message: message.into(),
            },
        );
        self
    }

    /// Makes loads of `url` take `delay` before completing
    pub fn with_load_delay(self, url: impl Into<String>, delay: Duration) -> Self {
        self.lock().delays.insert(url.into(), delay);
        self
    }

    /// Makes rate changes on sounds of `url` take `delay`
    pub fn with_rate_delay(self, url: impl Into<String>, delay: Duration) -> Self {
        self.lock().rate_delays.insert(url.into(), delay);
        self
    }

    pub fn session_configurations(&self) -> usize {
        self.session_configurations.load(Ordering::SeqCst)
    }

    /// Number of sounds ever created
    pub fn sounds_created(&self) -> usize {
        self.lock().sounds.len()
    }

    /// State of the most recently created sound that is still loaded
    pub fn active(&self) -> Option<SoundState> {
        self.live_sounds().last().map(|sound| sound.lock().clone())
    }

    pub fn loaded_count(&self) -> usize {
        self.live_sounds().len()
    }

    /// Moves playback time forward for every loaded sound
    pub fn advance(&self, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();
        for sound in self.live_sounds() {
            sound.advance(seconds);
        }
    }

    /// Reports the current status of every loaded sound without moving time
    pub fn report(&self) {
        for sound in self.live_sounds() {
            sound.update(|_| false);
        }
    }

    /// Starts or stops buffering on the active sound
    pub fn set_buffering(&self, buffering: bool) {
        if let Some(sound) = self.live_sounds().last() {
            sound.update(|state| {
                state.buffering = buffering;
                false
            });
        }
    }

    /// Makes the active sound report a native error
    pub fn fail_active(&self, message: impl Into<String>) {
        let message = message.into();
        if let Some(sound) = self.live_sounds().last() {
            let status = NativeStatus {
                error: Some(message),
                ..sound.lock().status(false)
            };
            (sound.on_status)(status);
        }
    }

    /// Advances time by `period` on every tick until the handle is aborted
    pub fn spawn_ticker(&self, period: Duration) -> JoinHandle<()> {
        let backend = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                backend.advance(period);
            }
        })
    }

    fn live_sounds(&self) -> Vec<Arc<SimSound>> {
        self.lock()
            .sounds
            .iter()
            .filter(|sound| !sound.lock().unloaded)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl SoundBackend for SimulatedBackend {
    async fn configure_session(&self, config: &AudioSessionConfig) -> TransportResult<()> {
        debug!("Simulated audio session: {:?}", config);
        self.session_configurations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_sound(
        &self,
        url: &str,
        on_status: StatusCallback,
    ) -> TransportResult<Box<dyn Sound>> {
        let (media, delay, rate_delay) = {
            let registry = self.lock();
            (
                registry.media.get(url).cloned(),
                registry.delays.get(url).copied(),
                registry.rate_delays.get(url).copied(),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let duration = match media {
            Some(Media::Playable { duration }) => duration,
            Some(Media::Broken { message }) => {
                return Err(TransportError::LoadFailed {
                    url: url.to_string(),
                    message,
                })
            }
            None => {
                return Err(TransportError::LoadFailed {
                    url: url.to_string(),
                    message: "media not found".to_string(),
                })
            }
        };

        let sound = Arc::new(SimSound {
            state: Mutex::new(SoundState::new(url, duration)),
            on_status,
            rate_delay,
        });
        self.lock().sounds.push(Arc::clone(&sound));
        Ok(Box::new(SimulatedSound { inner: sound }))
    }
}

struct SimulatedSound {
    inner: Arc<SimSound>,
}

#[async_trait]
impl Sound for SimulatedSound {
    async fn play(&self) -> TransportResult<()> {
        self.inner.update(|state| {
            state.playing = true;
            false
        });
        Ok(())
    }

    async fn pause(&self) -> TransportResult<()> {
        self.inner.update(|state| {
            state.playing = false;
            false
        });
        Ok(())
    }

    async fn set_position(&self, seconds: f64) -> TransportResult<()> {
        self.inner.update(|state| {
            state.position = seconds.clamp(0.0, state.duration);
            false
        });
        Ok(())
    }

    async fn set_rate(&self, rate: f32) -> TransportResult<()> {
        if let Some(delay) = self.inner.rate_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.lock().rate = rate;
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> TransportResult<()> {
        self.inner.lock().volume = volume;
        Ok(())
    }

    async fn status(&self) -> TransportResult<NativeStatus> {
        Ok(self.inner.lock().status(false))
    }

    async fn unload(&self) -> TransportResult<()> {
        let mut state = self.inner.lock();
        state.playing = false;
        state.unloaded = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn recorder() -> (StatusCallback, Arc<StdMutex<Vec<NativeStatus>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: StatusCallback = Arc::new(move |status| sink.lock().unwrap().push(status));
        (callback, seen)
    }

    #[tokio::test]
    async fn test_unknown_media_fails_to_load() {
        let backend = SimulatedBackend::new();
        let (callback, _) = recorder();
        let result = backend.create_sound("https://missing", callback).await;
        assert!(matches!(result, Err(TransportError::LoadFailed { .. })));
    }

    #[tokio::test]
    async fn test_advance_moves_playing_sound_at_rate() {
        let backend = SimulatedBackend::new().with_media("a.mp3", 100.0);
        let (callback, seen) = recorder();
        let sound = backend.create_sound("a.mp3", callback).await.unwrap();

        backend.advance(Duration::from_secs(5));
        assert_eq!(backend.active().unwrap().position, 0.0);

        sound.set_rate(2.0).await.unwrap();
        sound.play().await.unwrap();
        backend.advance(Duration::from_secs(5));
        assert_eq!(backend.active().unwrap().position, 10.0);
        assert!(seen.lock().unwrap().last().unwrap().is_playing);
    }

    #[tokio::test]
    async fn test_reaching_end_reports_finish_once() {
        let backend = SimulatedBackend::new().with_media("a.mp3", 10.0);
        let (callback, seen) = recorder();
        let sound = backend.create_sound("a.mp3", callback).await.unwrap();
        sound.play().await.unwrap();

        backend.advance(Duration::from_secs(12));
        backend.report();

        let statuses = seen.lock().unwrap();
        let finishes = statuses.iter().filter(|s| s.did_just_finish).count();
        assert_eq!(finishes, 1);
        assert_eq!(statuses.last().unwrap().position_seconds, 10.0);
        assert!(!statuses.last().unwrap().is_playing);
    }

    #[tokio::test]
    async fn test_unloaded_sound_goes_quiet() {
        let backend = SimulatedBackend::new().with_media("a.mp3", 10.0);
        let (callback, seen) = recorder();
        let sound = backend.create_sound("a.mp3", callback).await.unwrap();
        sound.unload().await.unwrap();

        backend.advance(Duration::from_secs(1));
        sound.play().await.unwrap();

        assert!(seen.lock().unwrap().is_empty());
        assert!(backend.active().is_none());
        assert_eq!(backend.sounds_created(), 1);
    }
}
