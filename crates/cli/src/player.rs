// FILE: crates/cli/src/player.rs
//! Interactive terminal player
//!
//! Audio is produced by the simulated engine: chapters are registered with
//! their advertised durations and a ticker moves playback time forward.

use crate::commands::{self, PlayOptions};
use anyhow::{Context, Result};
use console::{style, Key, Term};
use narrate_config::{Config, ConfigManager};
use narrate_core::{Audiobook, AudiobookId, Chapter, Clock, SleepTimer, SystemClock, Timestamp};
use narrate_player::{PlayerPhase, PlayerSettings, PlayerState, PlayerStore, PreferenceStore};
use narrate_sync::{NoopReporter, ProgressReporter};
use narrate_transport::{AudioTransport, SimulatedBackend};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const TICK: Duration = Duration::from_millis(250);
const VOLUME_STEP: f32 = 0.05;
const BAR_WIDTH: usize = 50;

/// A store wired to a simulated engine
pub struct Session {
    pub store: PlayerStore,
    pub backend: SimulatedBackend,
}

impl Session {
    pub fn new(
        audiobook: &Audiobook,
        reporter: Arc<dyn ProgressReporter>,
        preferences: Arc<dyn PreferenceStore>,
        settings: PlayerSettings,
    ) -> Self {
        let backend = audiobook
            .chapters
            .iter()
            .fold(SimulatedBackend::new(), |backend, chapter| {
                backend.with_media(chapter.audio_url.as_str(), chapter.duration)
            });
        let transport = Arc::new(AudioTransport::new(Arc::new(backend.clone())));

        let store = PlayerStore::builder(transport)
            .reporter(reporter)
            .preferences(preferences)
            .settings(settings)
            .build();

        Self { store, backend }
    }
}

pub async fn start_playback(
    manager: ConfigManager,
    config: Config,
    options: PlayOptions,
) -> Result<()> {
    let (audiobook, reporter): (Audiobook, Arc<dyn ProgressReporter>) = if options.simulate {
        (demo_audiobook(&options.audiobook_id), Arc::new(NoopReporter))
    } else {
        let client = commands::api_client(&config)?;
        let audiobook = client
            .fetch_audiobook(&options.audiobook_id)
            .await
            .with_context(|| format!("Failed to fetch audiobook {}", options.audiobook_id))?;
        (audiobook, Arc::new(client))
    };

    let session = Session::new(
        &audiobook,
        reporter,
        Arc::new(manager),
        PlayerSettings::from_config(&config),
    );
    let store = session.store.clone();

    store
        .initialize()
        .await
        .context("Failed to configure the audio session")?;

    let events = tokio::spawn({
        let store = store.clone();
        async move { store.run_events().await }
    });
    let ticker = session.backend.spawn_ticker(TICK);

    store
        .load_audiobook(audiobook, options.chapter_index, options.position)
        .await;
    let loaded = store.snapshot();
    if !loaded.has_audiobook() {
        ticker.abort();
        events.abort();
        anyhow::bail!(loaded
            .error
            .unwrap_or_else(|| "Audiobook could not be loaded".to_string()));
    }
    if options.sleep_timer.is_some() {
        store.set_sleep_timer(options.sleep_timer);
    }
    store.play().await;

    let term = Term::stdout();
    if term.hide_cursor().is_err() {
        eprintln!("Warning: Failed to hide cursor");
    }

    let result = player_loop(&term, &store).await;

    store.unload_audiobook().await;
    ticker.abort();
    events.abort();
    let _ = term.show_cursor();

    let sync = store.sync_state();
    println!(
        "Progress reports: {} sent, {} failed",
        sync.reports_sent, sync.reports_failed
    );
    if let Some(error) = sync.last_error {
        println!("  Last sync error: {}", style(error).red());
    }

    result
}

async fn player_loop(term: &Term, store: &PlayerStore) -> Result<()> {
    let clock = SystemClock;
    let mut updates = store.subscribe();
    let mut keys = spawn_key_reader(term.clone());

    loop {
        draw(term, &store.snapshot(), clock.now())?;

        tokio::select! {
            key = keys.recv() => {
                let Some(key) = key else { break };
                match Action::from_key(&key) {
                    Some(Action::Quit) => break,
                    Some(action) => apply(store, action).await,
                    None => {}
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Reads keys on a dedicated thread; `read_key` blocks
fn spawn_key_reader(term: Term) -> mpsc::UnboundedReceiver<Key> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        while let Ok(key) = term.read_key() {
            if tx.send(key).is_err() {
                break;
            }
        }
    });
    rx
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    TogglePlay,
    SkipBackward,
    SkipForward,
    PreviousChapter,
    NextChapter,
    GoToChapter(usize),
    CycleSpeed,
    VolumeUp,
    VolumeDown,
    CycleSleepTimer,
    ToggleMinimized,
    Quit,
}

impl Action {
    fn from_key(key: &Key) -> Option<Self> {
        let action = match key {
            Key::Char(' ') => Self::TogglePlay,
            Key::ArrowLeft => Self::SkipBackward,
            Key::ArrowRight => Self::SkipForward,
            Key::Char('p') => Self::PreviousChapter,
            Key::Char('n') => Self::NextChapter,
            Key::Char('s') => Self::CycleSpeed,
            Key::Char('+') | Key::Char('=') => Self::VolumeUp,
            Key::Char('-') | Key::Char('_') => Self::VolumeDown,
            Key::Char('t') => Self::CycleSleepTimer,
            Key::Char('m') => Self::ToggleMinimized,
            Key::Char('q') | Key::Escape => Self::Quit,
            Key::Char(c) => match c.to_digit(10) {
                Some(digit) if digit > 0 => Self::GoToChapter(digit as usize - 1),
                _ => return None,
            },
            _ => return None,
        };
        Some(action)
    }
}

async fn apply(store: &PlayerStore, action: Action) {
    let state = store.snapshot();
    match action {
        Action::TogglePlay => store.toggle_play().await,
        Action::SkipBackward => store.skip_backward().await,
        Action::SkipForward => store.skip_forward().await,
        Action::PreviousChapter => store.previous_chapter().await,
        Action::NextChapter => store.next_chapter().await,
        Action::GoToChapter(index) => store.go_to_chapter(index).await,
        Action::CycleSpeed => {
            store.cycle_playback_speed().await;
        }
        Action::VolumeUp => {
            store.set_volume(state.volume + VOLUME_STEP).await;
        }
        Action::VolumeDown => {
            store.set_volume(state.volume - VOLUME_STEP).await;
        }
        Action::CycleSleepTimer => store.set_sleep_timer(next_sleep_timer(state.sleep_timer)),
        Action::ToggleMinimized => {
            if state.is_minimized {
                store.maximize();
            } else {
                store.minimize();
            }
        }
        Action::Quit => {}
    }
}

/// Off, then each preset, then end of chapter, then off again
fn next_sleep_timer(current: Option<SleepTimer>) -> Option<SleepTimer> {
    let presets = SleepTimer::PRESET_MINUTES;
    match current {
        None => Some(SleepTimer::Minutes(presets[0])),
        Some(SleepTimer::Minutes(minutes)) => {
            match presets.iter().position(|preset| *preset == minutes) {
                Some(i) if i + 1 < presets.len() => Some(SleepTimer::Minutes(presets[i + 1])),
                _ => Some(SleepTimer::EndOfChapter),
            }
        }
        Some(SleepTimer::EndOfChapter) => None,
    }
}

fn draw(term: &Term, state: &PlayerState, now: Timestamp) -> Result<()> {
    term.clear_screen().context("Failed to clear screen")?;
    for line in render(state, now) {
        term.write_line(&line).context("Failed to draw player")?;
    }
    Ok(())
}

fn render(state: &PlayerState, now: Timestamp) -> Vec<String> {
    let Some(audiobook) = state.audiobook.as_ref() else {
        return vec![style("  Nothing loaded").dim().to_string()];
    };
    let chapter_line = format!(
        "Chapter {}/{}: {}",
        state.chapter_index + 1,
        audiobook.chapter_count(),
        state.current_chapter().map(|c| c.title.as_str()).unwrap_or("")
    );
    let time_line = format!(
        "{} / {}",
        format_clock(state.current_time),
        format_clock(state.duration)
    );

    if state.is_minimized {
        return vec![format!(
            "  {} {} · {} · {}   (m to expand)",
            phase_label(state.phase()),
            style(&audiobook.title).bold(),
            chapter_line,
            time_line
        )];
    }

    let mut lines = vec![
        String::new(),
        format!("  {}", style(&audiobook.title).bold().cyan()),
        format!("  by {}", style(&audiobook.author).dim()),
        String::new(),
        format!("  {}", chapter_line),
        format!("  {}", time_line),
        format!("  {}", progress_bar(state.current_time, state.duration, BAR_WIDTH)),
        String::new(),
        format!("  Status: {}", phase_label(state.phase())),
        format!("  Speed: {}", state.playback_speed),
        format!("  Volume: {:.0}%", state.volume * 100.0),
    ];

    match (state.sleep_timer, state.sleep_remaining_millis(now)) {
        (Some(_), Some(remaining)) => lines.push(format!(
            "  Sleep: {} left",
            format_clock(remaining as f64 / 1000.0)
        )),
        (Some(timer), None) => lines.push(format!("  Sleep: {}", timer)),
        (None, _) => {}
    }
    if let Some(error) = &state.error {
        lines.push(format!("  Error: {}", style(error).red()));
    }

    lines.extend(
        [
            "",
            "  Controls:",
            "    Space   - Play/Pause",
            "    ←/→     - Skip back/forward",
            "    p/n     - Previous/next chapter",
            "    1-9     - Jump to chapter",
            "    s       - Cycle speed",
            "    +/-     - Volume up/down",
            "    t       - Cycle sleep timer",
            "    m       - Minimize",
            "    Q/Esc   - Quit",
        ]
        .iter()
        .map(|line| line.to_string()),
    );
    lines
}

fn phase_label(phase: PlayerPhase) -> String {
    let label = match phase {
        PlayerPhase::Playing => style("Playing").green(),
        PlayerPhase::Paused => style("Paused").yellow(),
        PlayerPhase::Loading => style("Loading").cyan(),
        PlayerPhase::Buffering => style("Buffering").cyan(),
        PlayerPhase::Error => style("Error").red(),
        PlayerPhase::Empty => style("Stopped").dim(),
    };
    label.to_string()
}

fn progress_bar(current: f64, duration: f64, width: usize) -> String {
    let ratio = if duration > 0.0 && current.is_finite() {
        (current / duration).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = ((ratio * width as f64) as usize).min(width);
    format!(
        "[{}{}] {:.0}%",
        "=".repeat(filled),
        " ".repeat(width - filled),
        ratio * 100.0
    )
}

/// `mm:ss`, or `h:mm:ss` from one hour up
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Three short chapters served by the simulated engine
fn demo_audiobook(id: &AudiobookId) -> Audiobook {
    let chapter = |number: u32, title: &str, duration: f64| {
        Chapter::new(
            format!("{}-{}", id, number),
            number,
            title,
            format!("sim://{}/{}.mp3", id, number),
            duration,
        )
    };

    Audiobook::new(
        id.as_str(),
        "Demo Audiobook",
        "Narrate",
        vec![
            chapter(1, "Opening", 95.0),
            chapter(2, "The Middle", 180.0),
            chapter(3, "Closing", 42.0),
        ],
    )
    .with_narrator("Simulated Voice")
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrate_core::{PlaybackSpeed, Validator};
    use narrate_player::MemoryPreferences;
    use narrate_sync::MemoryReporter;

    fn demo_session() -> (Session, MemoryReporter) {
        let reporter = MemoryReporter::new();
        let session = Session::new(
            &demo_audiobook(&AudiobookId::new("demo")),
            Arc::new(reporter.clone()),
            Arc::new(MemoryPreferences::default()),
            PlayerSettings::default(),
        );
        (session, reporter)
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "00:00");
        assert_eq!(format_clock(65.9), "01:05");
        assert_eq!(format_clock(3_725.0), "1:02:05");
        assert_eq!(format_clock(-3.0), "00:00");
        assert_eq!(format_clock(f64::NAN), "00:00");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 100.0, 10), "[          ] 0%");
        assert_eq!(progress_bar(50.0, 100.0, 10), "[=====     ] 50%");
        assert_eq!(progress_bar(150.0, 100.0, 10), "[==========] 100%");
        assert_eq!(progress_bar(10.0, 0.0, 4), "[    ] 0%");
    }

    #[test]
    fn test_sleep_timer_cycle() {
        let mut timer = None;
        let mut seen = Vec::new();
        for _ in 0..8 {
            timer = next_sleep_timer(timer);
            seen.push(timer);
        }

        assert_eq!(seen[0], Some(SleepTimer::Minutes(5)));
        assert_eq!(seen[5], Some(SleepTimer::Minutes(60)));
        assert_eq!(seen[6], Some(SleepTimer::EndOfChapter));
        assert_eq!(seen[7], None);
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(Action::from_key(&Key::Char(' ')), Some(Action::TogglePlay));
        assert_eq!(Action::from_key(&Key::Char('3')), Some(Action::GoToChapter(2)));
        assert_eq!(Action::from_key(&Key::Char('0')), None);
        assert_eq!(Action::from_key(&Key::Escape), Some(Action::Quit));
        assert_eq!(Action::from_key(&Key::ArrowRight), Some(Action::SkipForward));
        assert_eq!(Action::from_key(&Key::Char('x')), None);
    }

    #[test]
    fn test_demo_audiobook_is_valid() {
        let audiobook = demo_audiobook(&AudiobookId::new("demo"));
        assert!(audiobook.validate().is_ok());
        assert_eq!(audiobook.chapter_count(), 3);
        assert_eq!(audiobook.id.as_str(), "demo");
    }

    #[test]
    fn test_render_states() {
        let now = Timestamp::from_millis(1_000);
        assert_eq!(render(&PlayerState::default(), now).len(), 1);

        let mut state = PlayerState {
            audiobook: Some(Arc::new(demo_audiobook(&AudiobookId::new("demo")))),
            chapter_index: 1,
            current_time: 61.0,
            duration: 180.0,
            playback_speed: PlaybackSpeed::OneAndHalf,
            sleep_timer: Some(SleepTimer::Minutes(5)),
            sleep_timer_end_time: Some(Timestamp::from_millis(121_000)),
            ..PlayerState::default()
        };

        let lines = render(&state, now);
        assert!(lines.iter().any(|l| l.contains("Chapter 2/3: The Middle")));
        assert!(lines.iter().any(|l| l.contains("01:01 / 03:00")));
        assert!(lines.iter().any(|l| l.contains("Sleep: 02:00 left")));
        assert!(lines.iter().any(|l| l.contains("1.5x")));

        state.is_minimized = true;
        let lines = render(&state, now);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Chapter 2/3"));
    }

    #[tokio::test]
    async fn test_session_plays_demo_chapters() {
        let (session, reporter) = demo_session();
        let store = &session.store;

        store
            .load_audiobook(demo_audiobook(&AudiobookId::new("demo")), 0, 0.0)
            .await;
        store.play().await;
        store.drain_events().await;

        session.backend.advance(Duration::from_secs(95));
        store.drain_events().await;

        let state = store.snapshot();
        assert_eq!(state.chapter_index, 1);
        assert!(state.is_playing);
        assert_eq!(reporter.count(), 1);
    }

    #[tokio::test]
    async fn test_apply_actions() {
        let (session, _reporter) = demo_session();
        let store = &session.store;
        store
            .load_audiobook(demo_audiobook(&AudiobookId::new("demo")), 0, 0.0)
            .await;

        apply(store, Action::GoToChapter(2)).await;
        assert_eq!(store.snapshot().chapter_index, 2);

        apply(store, Action::VolumeDown).await;
        assert!((store.snapshot().volume - 0.95).abs() < 1e-6);

        apply(store, Action::CycleSleepTimer).await;
        assert_eq!(store.snapshot().sleep_timer, Some(SleepTimer::Minutes(5)));

        apply(store, Action::ToggleMinimized).await;
        assert!(store.snapshot().is_minimized);
        apply(store, Action::ToggleMinimized).await;
        assert!(!store.snapshot().is_minimized);
    }
}
