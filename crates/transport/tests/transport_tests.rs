//! Integration tests for the audio transport over the simulated backend

use narrate_core::PlaybackSpeed;
use narrate_transport::{
    AudioTransport, Cue, SimulatedBackend, TransportError, TransportEvent, TransportEventKind,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CHAPTER_1: &str = "https://cdn.example/book/1.mp3";
const CHAPTER_2: &str = "https://cdn.example/book/2.mp3";

fn setup() -> (Arc<AudioTransport>, SimulatedBackend, Arc<Mutex<Vec<TransportEvent>>>) {
    let backend = SimulatedBackend::new()
        .with_media(CHAPTER_1, 600.0)
        .with_media(CHAPTER_2, 900.0);
    let transport = Arc::new(AudioTransport::new(Arc::new(backend.clone())));
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    transport.on_any(move |event| sink.lock().unwrap().push(event.clone()));
    (transport, backend, events)
}

fn kinds(events: &Arc<Mutex<Vec<TransportEvent>>>) -> Vec<TransportEventKind> {
    events.lock().unwrap().iter().map(|e| e.kind()).collect()
}

#[tokio::test]
async fn test_initialize_configures_session_once() {
    let (transport, backend, _) = setup();
    assert!(!transport.is_initialized());

    transport.initialize().await.unwrap();
    transport.initialize().await.unwrap();

    assert!(transport.is_initialized());
    assert_eq!(backend.session_configurations(), 1);
}

#[tokio::test]
async fn test_load_emits_loadstart_then_canplay() {
    let (transport, backend, events) = setup();

    transport.load(CHAPTER_1).await.unwrap();

    assert_eq!(
        kinds(&events),
        vec![TransportEventKind::LoadStart, TransportEventKind::CanPlay]
    );
    assert_eq!(transport.loaded_url().await.as_deref(), Some(CHAPTER_1));
    let state = backend.active().unwrap();
    assert!(!state.playing);
    assert_eq!(state.position, 0.0);
}

#[tokio::test]
async fn test_load_replaces_previous_resource() {
    let (transport, backend, _) = setup();

    transport.load(CHAPTER_1).await.unwrap();
    transport.load(CHAPTER_2).await.unwrap();

    assert_eq!(backend.loaded_count(), 1);
    assert_eq!(backend.active().unwrap().url, CHAPTER_2);
}

#[tokio::test]
async fn test_failed_load_emits_error() {
    let (transport, _, events) = setup();

    let result = transport.load("https://cdn.example/missing.mp3").await;

    assert!(matches!(result, Err(TransportError::LoadFailed { .. })));
    assert!(kinds(&events).contains(&TransportEventKind::Error));
    assert!(!transport.is_loaded().await);
}

#[tokio::test(start_paused = true)]
async fn test_slow_load_is_superseded_by_newer_load() {
    let backend = SimulatedBackend::new()
        .with_media(CHAPTER_1, 600.0)
        .with_media(CHAPTER_2, 900.0)
        .with_load_delay(CHAPTER_1, Duration::from_secs(2));
    let transport = Arc::new(AudioTransport::new(Arc::new(backend.clone())));

    let slow = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move { transport.load(CHAPTER_1).await })
    };
    tokio::task::yield_now().await;
    let fast = transport.load(CHAPTER_2).await;

    let slow = slow.await.unwrap();
    assert!(slow.unwrap_err().is_superseded());
    assert!(fast.is_ok());
    assert_eq!(transport.loaded_url().await.as_deref(), Some(CHAPTER_2));
    assert_eq!(backend.loaded_count(), 1);
}

fn cue_at(position: f64, autoplay: bool) -> Cue {
    Cue {
        speed: PlaybackSpeed::OneAndHalf,
        volume: 0.5,
        position,
        autoplay,
    }
}

#[tokio::test]
async fn test_cue_applies_settings_to_loaded_resource() {
    let (transport, backend, _) = setup();
    let generation = transport.load(CHAPTER_1).await.unwrap();

    transport.cue(generation, cue_at(700.0, true)).await.unwrap();

    let state = backend.active().unwrap();
    assert_eq!(state.rate, 1.5);
    assert_eq!(state.volume, 0.5);
    assert_eq!(state.position, 600.0);
    assert!(state.playing);
}

#[tokio::test]
async fn test_cue_for_older_load_is_rejected() {
    let (transport, backend, _) = setup();
    let first = transport.load(CHAPTER_1).await.unwrap();
    let second = transport.load(CHAPTER_2).await.unwrap();

    let result = transport.cue(first, cue_at(120.0, true)).await;

    assert_eq!(result, Err(TransportError::Stale(first)));
    let state = backend.active().unwrap();
    assert_eq!(state.url, CHAPTER_2);
    assert_eq!(state.position, 0.0);
    assert_eq!(state.rate, 1.0);
    assert!(!state.playing);

    transport.cue(second, cue_at(0.0, false)).await.unwrap();
    assert_eq!(backend.active().unwrap().rate, 1.5);
}

#[tokio::test(start_paused = true)]
async fn test_cue_stops_when_newer_load_starts_midway() {
    let backend = SimulatedBackend::new()
        .with_media(CHAPTER_1, 600.0)
        .with_media(CHAPTER_2, 900.0)
        .with_rate_delay(CHAPTER_1, Duration::from_secs(1));
    let transport = Arc::new(AudioTransport::new(Arc::new(backend.clone())));
    let first = transport.load(CHAPTER_1).await.unwrap();

    let slow = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move { transport.cue(first, cue_at(120.0, true)).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    transport.load(CHAPTER_2).await.unwrap();

    assert!(slow.await.unwrap().unwrap_err().is_superseded());
    let state = backend.active().unwrap();
    assert_eq!(state.url, CHAPTER_2);
    assert_eq!(state.position, 0.0);
    assert!(!state.playing);
    assert_eq!(backend.loaded_count(), 1);
}

#[tokio::test]
async fn test_play_and_pause_are_edge_triggered() {
    let (transport, backend, events) = setup();
    transport.load(CHAPTER_1).await.unwrap();
    events.lock().unwrap().clear();

    transport.play().await.unwrap();
    backend.advance(Duration::from_secs(1));
    backend.advance(Duration::from_secs(1));
    transport.pause().await.unwrap();

    let seen = kinds(&events);
    let plays = seen.iter().filter(|k| **k == TransportEventKind::Play).count();
    let pauses = seen.iter().filter(|k| **k == TransportEventKind::Pause).count();
    assert_eq!(plays, 1);
    assert_eq!(pauses, 1);
    assert_eq!(transport.current_position().await.unwrap(), 2.0);
}

#[tokio::test]
async fn test_pause_when_paused_skips_native_call() {
    let (transport, _, events) = setup();
    transport.load(CHAPTER_1).await.unwrap();
    events.lock().unwrap().clear();

    transport.pause().await.unwrap();

    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_toggle_play_reports_new_state() {
    let (transport, _, _) = setup();
    assert_eq!(transport.toggle_play().await.unwrap(), None);

    transport.load(CHAPTER_1).await.unwrap();
    assert_eq!(transport.toggle_play().await.unwrap(), Some(true));
    assert_eq!(transport.toggle_play().await.unwrap(), Some(false));
}

#[tokio::test]
async fn test_relative_seeks_clamp_to_bounds() {
    let (transport, _, _) = setup();
    transport.load(CHAPTER_1).await.unwrap();

    assert_eq!(transport.seek_backward(15.0).await.unwrap(), Some(0.0));
    assert_eq!(transport.seek(590.0).await.unwrap(), Some(590.0));
    assert_eq!(transport.seek_forward(30.0).await.unwrap(), Some(600.0));
    assert_eq!(transport.current_position().await.unwrap(), 600.0);
}

#[tokio::test]
async fn test_operations_without_resource_are_noops() {
    let (transport, _, events) = setup();

    transport.play().await.unwrap();
    transport.pause().await.unwrap();
    assert_eq!(transport.seek(10.0).await.unwrap(), None);
    assert_eq!(transport.current_position().await.unwrap(), 0.0);
    assert_eq!(transport.duration().await.unwrap(), 0.0);
    transport.unload().await.unwrap();

    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_speed_and_volume_reach_backend() {
    let (transport, backend, _) = setup();
    transport.load(CHAPTER_1).await.unwrap();

    transport
        .set_playback_speed(PlaybackSpeed::OneAndHalf)
        .await
        .unwrap();
    let applied = transport.set_volume(1.4).await.unwrap();

    let state = backend.active().unwrap();
    assert_eq!(state.rate, 1.5);
    assert_eq!(applied, 1.0);
    assert_eq!(state.volume, 1.0);
}

#[tokio::test]
async fn test_end_of_media_emits_ended() {
    let (transport, backend, events) = setup();
    transport.load(CHAPTER_1).await.unwrap();
    transport.seek(595.0).await.unwrap();
    transport.play().await.unwrap();

    backend.advance(Duration::from_secs(10));

    assert_eq!(kinds(&events).last(), Some(&TransportEventKind::Ended));
}

#[tokio::test]
async fn test_unload_silences_stale_statuses() {
    let (transport, backend, events) = setup();
    transport.load(CHAPTER_1).await.unwrap();
    transport.play().await.unwrap();
    transport.unload().await.unwrap();
    events.lock().unwrap().clear();

    backend.advance(Duration::from_secs(3));

    assert!(events.lock().unwrap().is_empty());
    assert!(!transport.is_loaded().await);
}

#[tokio::test]
async fn test_listener_off_stops_delivery() {
    let (transport, _, _) = setup();
    let hits = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&hits);
    let id = transport.on(TransportEventKind::CanPlay, move |_| {
        *counter.lock().unwrap() += 1;
    });

    transport.load(CHAPTER_1).await.unwrap();
    assert!(transport.off(id));
    transport.load(CHAPTER_2).await.unwrap();

    assert_eq!(*hits.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_native_error_is_forwarded() {
    let (transport, backend, events) = setup();
    transport.load(CHAPTER_1).await.unwrap();

    backend.fail_active("decoder crashed");

    assert_eq!(
        events.lock().unwrap().last(),
        Some(&TransportEvent::Error("decoder crashed".to_string()))
    );
}
