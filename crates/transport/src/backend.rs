//! Seam between the transport and the platform's native sound primitive
//!
//! A backend creates at most one `Sound` per `load`. Native engines report
//! progress through a periodic status callback; the transport turns those
//! raw statuses into `TransportEvent`s.

use crate::error::TransportResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How the audio session reacts when another app starts playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptionMode {
    DoNotMix,
    DuckOthers,
    MixWithOthers,
}

/// One-time device audio session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSessionConfig {
    pub stays_active_in_background: bool,
    pub plays_in_silent_mode: bool,
    pub interruption_mode: InterruptionMode,
}

impl Default for AudioSessionConfig {
    fn default() -> Self {
        Self {
            stays_active_in_background: true,
            plays_in_silent_mode: true,
            interruption_mode: InterruptionMode::DoNotMix,
        }
    }
}

/// Raw playback status as reported by the native engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeStatus {
    pub is_loaded: bool,
    pub is_playing: bool,
    pub is_buffering: bool,
    /// Set on exactly one status when the media reaches its end
    pub did_just_finish: bool,
    pub position_seconds: f64,
    pub duration_seconds: Option<f64>,
    pub error: Option<String>,
}

/// Receives every status the native engine reports for one sound
pub type StatusCallback = Arc<dyn Fn(NativeStatus) + Send + Sync>;

/// Factory for native sounds
#[async_trait]
pub trait SoundBackend: Send + Sync {
    /// Applies the audio session configuration
    async fn configure_session(&self, config: &AudioSessionConfig) -> TransportResult<()>;

    /// Loads `url` and returns a paused sound that reports through `on_status`
    async fn create_sound(
        &self,
        url: &str,
        on_status: StatusCallback,
    ) -> TransportResult<Box<dyn Sound>>;
}

/// A single loaded media resource
#[async_trait]
pub trait Sound: Send + Sync {
    async fn play(&self) -> TransportResult<()>;

    async fn pause(&self) -> TransportResult<()>;

    /// Absolute position in seconds
    async fn set_position(&self, seconds: f64) -> TransportResult<()>;

    async fn set_rate(&self, rate: f32) -> TransportResult<()>;

    async fn set_volume(&self, volume: f32) -> TransportResult<()>;

    async fn status(&self) -> TransportResult<NativeStatus>;

    /// Releases the native resource; the sound reports nothing afterwards
    async fn unload(&self) -> TransportResult<()>;
}
