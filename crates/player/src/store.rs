// crates/player/src/store.rs
//! The player state store
//!
//! Commands go to the transport; the transport answers with events; the
//! store reduces those events into `PlayerState` and publishes every change
//! on a watch channel.
//!
//! Events are queued by a single listener registered at construction and
//! reduced by `run_events` (a long-running task) or `drain_events` (pump what
//! is queued). A host uses one or the other, never both.
//!
//! Every load, unload and chapter change starts a new session generation.
//! Queued events and async results carry the generation they were produced
//! under and are discarded once it is stale.

use crate::error::{PlayerError, PlayerResult};
use crate::preferences::{MemoryPreferences, PreferenceStore, Preferences};
use crate::settings::PlayerSettings;
use crate::state::PlayerState;
use log::{debug, error, info, warn};
use narrate_core::{Audiobook, Clock, PlaybackSpeed, SleepTimer, SystemClock, Validator};
use narrate_sync::{NoopReporter, PeriodicSync, ProgressReporter, ProgressSync, SyncState};
use narrate_transport::{
    AudioTransport, Cue, ListenerId, TransportError, TransportEvent, TransportResult,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};

type QueuedEvent = (u64, TransportEvent);

struct Inner {
    transport: Arc<AudioTransport>,
    state: watch::Sender<PlayerState>,
    events: AsyncMutex<mpsc::UnboundedReceiver<QueuedEvent>>,
    listener: ListenerId,
    session: Arc<AtomicU64>,
    sync: ProgressSync,
    periodic: Mutex<PeriodicSync>,
    preferences: Arc<dyn PreferenceStore>,
    clock: Arc<dyn Clock>,
    settings: PlayerSettings,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.transport.off(self.listener);
    }
}

/// Configures and builds a `PlayerStore`
pub struct PlayerStoreBuilder {
    transport: Arc<AudioTransport>,
    reporter: Arc<dyn ProgressReporter>,
    preferences: Arc<dyn PreferenceStore>,
    clock: Arc<dyn Clock>,
    settings: PlayerSettings,
}

impl PlayerStoreBuilder {
    pub fn reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(mut self, settings: PlayerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Reads the persisted preferences and subscribes to the transport
    pub fn build(self) -> PlayerStore {
        let preferences = self.preferences.load().unwrap_or_else(|e| {
            warn!("Using default preferences: {}", e);
            Preferences::default()
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(AtomicU64::new(0));
        let tag = Arc::clone(&session);
        let listener = self.transport.on_any(move |event| {
            // The receiver only goes away with the store itself
            let _ = tx.send((tag.load(Ordering::SeqCst), event.clone()));
        });

        let (state, _) = watch::channel(PlayerState::new(preferences));

        PlayerStore {
            inner: Arc::new(Inner {
                transport: self.transport,
                state,
                events: AsyncMutex::new(rx),
                listener,
                session,
                sync: ProgressSync::new(self.reporter, self.settings.sync_timeout),
                periodic: Mutex::new(PeriodicSync::new(self.settings.sync_interval)),
                preferences: self.preferences,
                clock: self.clock,
                settings: self.settings,
            }),
        }
    }
}

/// Single source of truth for playback
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct PlayerStore {
    inner: Arc<Inner>,
}

impl PlayerStore {
    /// Starts a builder with no-op progress reporting, in-memory
    /// preferences, the system clock and default settings
    pub fn builder(transport: Arc<AudioTransport>) -> PlayerStoreBuilder {
        PlayerStoreBuilder {
            transport,
            reporter: Arc::new(NoopReporter),
            preferences: Arc::new(MemoryPreferences::default()),
            clock: Arc::new(SystemClock),
            settings: PlayerSettings::default(),
        }
    }

    pub fn snapshot(&self) -> PlayerState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlayerState> {
        self.inner.state.subscribe()
    }

    pub fn transport(&self) -> &Arc<AudioTransport> {
        &self.inner.transport
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.inner.settings
    }

    pub fn sync_state(&self) -> SyncState {
        self.inner.sync.state()
    }

    pub fn is_periodic_sync_running(&self) -> bool {
        self.lock_periodic().is_running()
    }

    /// Configures the audio session ahead of the first load
    pub async fn initialize(&self) -> PlayerResult<()> {
        Ok(self.inner.transport.initialize().await?)
    }

    // ===== Event reduction =====

    /// Reduces transport events as they arrive, until the store is dropped
    pub async fn run_events(&self) {
        let mut events = self.inner.events.lock().await;
        while let Some((generation, event)) = events.recv().await {
            self.handle_event(generation, event).await;
        }
    }

    /// Reduces every queued event, including those queued while reducing.
    /// Returns how many were handled.
    pub async fn drain_events(&self) -> usize {
        let mut events = self.inner.events.lock().await;
        let mut handled = 0;
        while let Ok((generation, event)) = events.try_recv() {
            self.handle_event(generation, event).await;
            handled += 1;
        }
        handled
    }

    async fn handle_event(&self, generation: u64, event: TransportEvent) {
        if !self.is_current(generation) {
            debug!("Dropping stale {} event", event.kind());
            return;
        }
        if !self.has_audiobook() {
            return;
        }

        match event {
            TransportEvent::LoadStart => self.modify(|s| s.is_loading = true),
            TransportEvent::CanPlay => self.modify(|s| s.is_loading = false),
            TransportEvent::Play => self.modify(|s| {
                s.is_playing = true;
                s.is_buffering = false;
            }),
            TransportEvent::Pause => self.modify(|s| s.is_playing = false),
            TransportEvent::Buffering => self.modify(|s| s.is_buffering = true),
            TransportEvent::TimeUpdate {
                current_time,
                duration,
            } => self.update_time(current_time, duration).await,
            TransportEvent::Ended => {
                debug!("Chapter ended");
                self.modify(|s| s.is_playing = false);
                self.next_chapter().await;
            }
            TransportEvent::Error(message) => {
                error!("Transport error: {}", message);
                self.modify(|s| {
                    s.error = Some(message);
                    s.is_loading = false;
                    s.is_playing = false;
                    s.is_buffering = false;
                });
            }
        }
    }

    // ===== Lifecycle =====

    /// Loads `audiobook` and cues `start_chapter` at `start_position`
    ///
    /// A previously loaded audiobook is unloaded first. An out-of-range
    /// start chapter falls back to the first chapter at position 0. Failures
    /// land in `error`; the audiobook stays loaded. An invalid audiobook is
    /// refused and leaves a loaded session untouched.
    pub async fn load_audiobook(
        &self,
        audiobook: Audiobook,
        start_chapter: usize,
        start_position: f64,
    ) {
        if let Err(reasons) = audiobook.validate() {
            let err = PlayerError::InvalidAudiobook {
                id: audiobook.id.to_string(),
                reasons: reasons.join("; "),
            };
            warn!("Refusing to load: {}", err);
            if !self.has_audiobook() {
                self.modify(|s| s.error = Some(err.to_string()));
            }
            return;
        }

        if self.has_audiobook() {
            self.unload_audiobook().await;
        }

        let (chapter_index, position) = if start_chapter < audiobook.chapter_count() {
            let position = if start_position.is_finite() {
                start_position.max(0.0)
            } else {
                0.0
            };
            (start_chapter, position)
        } else {
            warn!(
                "Start chapter {} is out of range for {}, starting from the beginning",
                start_chapter, audiobook.id
            );
            (0, 0.0)
        };

        let Some(chapter) = audiobook.chapter(chapter_index).cloned() else {
            return;
        };

        info!(
            "Loading '{}' at chapter {} ({:.0}s)",
            audiobook.title, chapter.number, position
        );

        let generation = self.next_generation();
        let audiobook = Arc::new(audiobook);
        self.modify(|s| {
            s.audiobook = Some(audiobook);
            s.chapter_index = chapter_index;
            s.current_time = position;
            s.duration = chapter.duration;
            s.is_visible = true;
            s.is_minimized = false;
            s.error = None;
            s.is_loading = true;
            s.is_playing = false;
            s.is_buffering = false;
            s.clear_sleep_timer();
        });
        self.start_periodic_sync();

        match self
            .load_media(generation, &chapter.audio_url, position, false)
            .await {
            Ok(()) => self.finish_loading(generation),
            Err(e) => self.fail(generation, e),
        }
    }

    /// Pauses, reports the final position once, and resets the session.
    /// Speed and volume survive.
    pub async fn unload_audiobook(&self) {
        let state = self.snapshot();
        let Some(audiobook) = state.audiobook.clone() else {
            return;
        };
        info!("Unloading '{}'", audiobook.title);

        self.lock_periodic().stop();

        if let Err(e) = self.inner.transport.pause().await {
            warn!("Pause before unload failed: {}", e);
        }
        self.flush(&state).await;

        self.next_generation();
        if let Err(e) = self.inner.transport.unload().await {
            warn!("Unload failed: {}", e);
        }

        self.inner.sync.tracker().forget(&audiobook.id);
        self.modify(|s| s.reset_session());
    }

    // ===== Transport control =====

    pub async fn play(&self) {
        if !self.has_audiobook() {
            return;
        }
        let generation = self.generation();
        let result = self.inner.transport.play().await;
        self.check(generation, result);
    }

    /// Pauses and reports progress. Already paused is a no-op.
    pub async fn pause(&self) {
        if !self.has_audiobook() {
            return;
        }
        if !self.inner.transport.is_playing().await {
            debug!("pause ignored: not playing");
            return;
        }

        let generation = self.generation();
        let result = self.inner.transport.pause().await;
        if self.check(generation, result).is_some() {
            self.flush(&self.snapshot()).await;
        }
    }

    pub async fn toggle_play(&self) {
        if !self.has_audiobook() {
            return;
        }
        let generation = self.generation();
        let result = self.inner.transport.toggle_play().await;
        if let Some(Some(false)) = self.check(generation, result) {
            self.flush(&self.snapshot()).await;
        }
    }

    /// Seeks to an absolute position and shows it right away
    pub async fn seek(&self, seconds: f64) {
        if !self.has_audiobook() {
            return;
        }
        let generation = self.generation();
        let result = self.inner.transport.seek(seconds).await;
        self.snap_time(generation, result);
    }

    pub async fn seek_forward(&self, seconds: f64) {
        if !self.has_audiobook() {
            return;
        }
        let generation = self.generation();
        let result = self.inner.transport.seek_forward(seconds).await;
        self.snap_time(generation, result);
    }

    pub async fn seek_backward(&self, seconds: f64) {
        if !self.has_audiobook() {
            return;
        }
        let generation = self.generation();
        let result = self.inner.transport.seek_backward(seconds).await;
        self.snap_time(generation, result);
    }

    /// Seeks forward by the configured skip length
    pub async fn skip_forward(&self) {
        self.seek_forward(self.inner.settings.skip_forward_secs).await;
    }

    /// Seeks backward by the configured skip length
    pub async fn skip_backward(&self) {
        self.seek_backward(self.inner.settings.skip_backward_secs).await;
    }

    // ===== Chapter navigation =====

    /// Advances to the next chapter and plays it
    ///
    /// With an end-of-chapter sleep timer the timer is cleared and playback
    /// stops in place instead. On the last chapter playback stops.
    pub async fn next_chapter(&self) {
        let state = self.snapshot();
        let Some(audiobook) = state.audiobook.clone() else {
            return;
        };

        if state.sleep_timer.is_some_and(|t| t.is_end_of_chapter()) {
            info!("End-of-chapter sleep timer reached");
            self.modify(|s| s.clear_sleep_timer());
            self.halt(&state).await;
            return;
        }

        if audiobook.is_last_chapter(state.chapter_index) {
            info!("Reached the end of '{}'", audiobook.title);
            self.halt(&state).await;
            return;
        }

        self.flush(&state).await;
        self.change_chapter(state.chapter_index + 1, true).await;
    }

    /// Restarts the current chapter, or goes back one when near its start
    pub async fn previous_chapter(&self) {
        let state = self.snapshot();
        if !state.has_audiobook() {
            return;
        }

        if state.current_time > self.inner.settings.restart_threshold_secs {
            self.seek(0.0).await;
            return;
        }
        if state.chapter_index == 0 {
            debug!("Already at the first chapter");
            return;
        }

        self.flush(&state).await;
        self.change_chapter(state.chapter_index - 1, state.is_playing)
            .await;
    }

    /// Jumps to `index`, keeping the current play/pause intent
    pub async fn go_to_chapter(&self, index: usize) {
        let state = self.snapshot();
        let Some(audiobook) = state.audiobook.as_ref() else {
            return;
        };
        if index >= audiobook.chapter_count() {
            debug!(
                "Ignoring jump to chapter index {} of {}",
                index,
                audiobook.chapter_count()
            );
            return;
        }

        self.flush(&state).await;
        self.change_chapter(index, state.is_playing).await;
    }

    // ===== Preferences =====

    /// Applies `speed` now and remembers it for later loads
    pub async fn set_playback_speed(&self, speed: PlaybackSpeed) {
        info!("Playback speed {}", speed);
        self.modify(|s| s.playback_speed = speed);

        let generation = self.generation();
        let result = self.inner.transport.set_playback_speed(speed).await;
        self.check(generation, result);
        self.persist_preferences();
    }

    /// Switches to the next faster speed, wrapping to the slowest
    pub async fn cycle_playback_speed(&self) -> PlaybackSpeed {
        let next = self.snapshot().playback_speed.next();
        self.set_playback_speed(next).await;
        next
    }

    /// Applies a volume clamped to [0, 1] and remembers it. Returns the
    /// applied value.
    pub async fn set_volume(&self, volume: f32) -> f32 {
        let generation = self.generation();
        let result = self.inner.transport.set_volume(volume).await;
        let Some(applied) = self.check(generation, result) else {
            return self.snapshot().volume;
        };

        self.modify(|s| s.volume = applied);
        self.persist_preferences();
        applied
    }

    // ===== Sleep timer =====

    /// Arms, replaces or (with `None`) clears the sleep timer
    pub fn set_sleep_timer(&self, timer: Option<SleepTimer>) {
        if !self.has_audiobook() {
            return;
        }
        let now = self.inner.clock.now();
        let end_time = timer.and_then(|t| t.deadline_from(now));
        debug!("Sleep timer {:?} until {:?}", timer, end_time);

        self.modify(|s| {
            s.sleep_timer = timer;
            s.sleep_timer_end_time = end_time;
        });
    }

    /// Records a position report and enforces an expired sleep timer
    pub async fn update_time(&self, current_time: f64, duration: f64) {
        if !self.has_audiobook() {
            return;
        }
        let now = self.inner.clock.now();
        let mut expired = false;

        self.modify(|s| {
            s.current_time = current_time;
            if duration > 0.0 {
                s.duration = duration;
            }
            s.is_buffering = false;
            if s.sleep_timer_end_time.is_some_and(|end| now >= end) {
                s.clear_sleep_timer();
                expired = true;
            }
        });

        if expired {
            info!("Sleep timer expired");
            self.pause().await;
        }
    }

    // ===== Presentation =====

    pub fn show(&self) {
        self.modify(|s| s.is_visible = true);
    }

    pub fn hide(&self) {
        self.modify(|s| s.is_visible = false);
    }

    pub fn minimize(&self) {
        self.modify(|s| s.is_minimized = true);
    }

    pub fn maximize(&self) {
        self.modify(|s| {
            s.is_visible = true;
            s.is_minimized = false;
        });
    }

    pub fn clear_error(&self) {
        self.modify(|s| s.error = None);
    }

    // ===== Progress sync =====

    /// Reports the current position now. Failures are logged only.
    pub async fn sync_progress(&self) {
        self.flush(&self.snapshot()).await;
    }

    async fn flush(&self, state: &PlayerState) {
        let (Some(audiobook), Some(update)) = (state.audiobook.as_ref(), state.progress_update())
        else {
            return;
        };
        // ProgressSync logs and counts failures
        let _ = self.inner.sync.flush(&audiobook.id, update).await;
    }

    async fn sync_if_playing(&self) {
        let state = self.snapshot();
        if !state.is_playing {
            return;
        }
        let (Some(audiobook), Some(update)) = (state.audiobook.as_ref(), state.progress_update())
        else {
            return;
        };
        let _ = self.inner.sync.sync_if_changed(&audiobook.id, update).await;
    }

    fn start_periodic_sync(&self) {
        let store: Weak<Inner> = Arc::downgrade(&self.inner);
        self.lock_periodic().start(move || {
            let store = store.clone();
            async move {
                if let Some(inner) = store.upgrade() {
                    PlayerStore { inner }.sync_if_playing().await;
                }
            }
        });
    }

    fn persist_preferences(&self) {
        let preferences = self.snapshot().preferences();
        if let Err(e) = self.inner.preferences.save(&preferences) {
            warn!("{}", e);
        }
    }

    // ===== Internals =====

    /// Loads `url` and cues it for session `generation`
    ///
    /// Preferences are read after the load completes so a speed or volume
    /// change made while loading is not lost.
    async fn load_media(
        &self,
        generation: u64,
        url: &str,
        position: f64,
        autoplay: bool,
    ) -> PlayerResult<()> {
        let transport = &self.inner.transport;

        transport.initialize().await?;
        let loaded = transport.load(url).await?;
        if !self.is_current(generation) {
            return Err(TransportError::Stale(loaded).into());
        }

        let preferences = self.snapshot().preferences();
        let cue = Cue {
            speed: preferences.playback_speed,
            volume: preferences.volume,
            position,
            autoplay,
        };
        transport.cue(loaded, cue).await?;
        Ok(())
    }

    async fn change_chapter(&self, index: usize, resume: bool) {
        let Some(chapter) = self
            .snapshot()
            .audiobook
            .as_ref()
            .and_then(|book| book.chapter(index).cloned())
        else {
            return;
        };

        debug!("Switching to chapter index {} (resume: {})", index, resume);
        let generation = self.next_generation();
        self.modify(|s| {
            s.chapter_index = index;
            s.current_time = 0.0;
            s.duration = chapter.duration;
            s.is_loading = true;
            s.is_playing = false;
            s.is_buffering = false;
            s.error = None;
        });

        match self
            .load_media(generation, &chapter.audio_url, 0.0, resume)
            .await {
            Ok(()) => self.finish_loading(generation),
            Err(e) => self.fail(generation, e),
        }
    }

    /// Stops in place and reports where playback stopped
    async fn halt(&self, state: &PlayerState) {
        let generation = self.generation();
        let result = self.inner.transport.pause().await;
        self.check(generation, result);
        self.modify(|s| s.is_playing = false);
        self.flush(state).await;
    }

    fn snap_time(&self, generation: u64, result: TransportResult<Option<f64>>) {
        if let Some(Some(applied)) = self.check(generation, result) {
            if self.is_current(generation) {
                self.modify(|s| s.current_time = applied);
            }
        }
    }

    fn finish_loading(&self, generation: u64) {
        if self.is_current(generation) {
            self.modify(|s| s.is_loading = false);
        }
    }

    fn check<T>(&self, generation: u64, result: TransportResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.fail(generation, e.into());
                None
            }
        }
    }

    fn fail(&self, generation: u64, err: PlayerError) {
        if !self.is_current(generation) {
            debug!("Ignoring failure from superseded work: {}", err);
            return;
        }
        error!("Playback failure: {}", err);
        let message = err.to_string();
        self.modify(|s| {
            s.error = Some(message);
            s.is_loading = false;
            s.is_playing = false;
            s.is_buffering = false;
        });
    }

    fn modify<F>(&self, change: F)
    where
        F: FnOnce(&mut PlayerState),
    {
        self.inner.state.send_modify(change);
    }

    fn has_audiobook(&self) -> bool {
        self.inner.state.borrow().has_audiobook()
    }

    fn generation(&self) -> u64 {
        self.inner.session.load(Ordering::SeqCst)
    }

    fn next_generation(&self) -> u64 {
        self.inner.session.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    fn lock_periodic(&self) -> MutexGuard<'_, PeriodicSync> {
        self.inner
            .periodic
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
