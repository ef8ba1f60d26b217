//! Player session module for embedmpv
//!
//! This module owns the session lifecycle: which intents are valid in which
//! state, the order in which they reach the engine, and what the interface
//! layer can observe afterwards.

mod controller;
mod state;

pub use controller::PlayerSessionController;
pub use state::SessionSnapshot;

use crate::region::RenderRegion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "playback")]
pub enum PlayerState {
    /// Engine not created yet
    Uninitialized,

    /// `init` in flight
    Initializing,

    /// Engine ready, no media
    Initialized,

    /// `load` in flight
    Loading,

    /// Media loaded
    Loaded(Playback),

    /// Playback stopped; engine still running
    Stopped,
}

/// Playback sub-state of a loaded session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Playback {
    Playing,
    Paused,
}

impl Playback {
    pub fn toggled(self) -> Self {
        match self {
            Playback::Playing => Playback::Paused,
            Playback::Paused => Playback::Playing,
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlayerState::Uninitialized => "uninitialized",
            PlayerState::Initializing => "initializing",
            PlayerState::Initialized => "initialized",
            PlayerState::Loading => "loading",
            PlayerState::Loaded(Playback::Playing) => "playing",
            PlayerState::Loaded(Playback::Paused) => "paused",
            PlayerState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Reference to the media to load; existence and format are the engine's concern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSource {
    pub path: String,
}

impl MediaSource {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self { path: path.into() }
    }
}

/// Whether loaded video has somewhere to be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    /// Nothing loaded
    NoMedia,

    /// Media loaded but no render region applied since; audio without picture
    AudioOnly,

    /// Video attached to the given region
    Attached(RenderRegion),
}

/// Request from the interface layer
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Initialize,
    LoadMedia(MediaSource),
    TogglePlayPause,
    Stop,
    SetSpeedPreset(f64),
    SetCustomSpeed(f64),
    AdjustSpeed(f64),
    ResetSpeed,
    QuerySpeed,
    ReportGeometry(RenderRegion),
}

impl Intent {
    /// Short description used in status messages
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Initialize => "initialize",
            Intent::LoadMedia(_) => "load media",
            Intent::TogglePlayPause => "toggle play/pause",
            Intent::Stop => "stop",
            Intent::SetSpeedPreset(_) => "apply a speed preset",
            Intent::SetCustomSpeed(_) => "set the playback speed",
            Intent::AdjustSpeed(_) => "adjust the playback speed",
            Intent::ResetSpeed => "reset the playback speed",
            Intent::QuerySpeed => "query the playback speed",
            Intent::ReportGeometry(_) => "configure the video area",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_toggle() {
        assert_eq!(Playback::Paused.toggled(), Playback::Playing);
        assert_eq!(Playback::Playing.toggled(), Playback::Paused);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PlayerState::Uninitialized.to_string(), "uninitialized");
        assert_eq!(PlayerState::Loaded(Playback::Playing).to_string(), "playing");
    }

    #[test]
    fn test_state_serialization() {
        let value = serde_json::to_value(PlayerState::Loaded(Playback::Paused)).unwrap();
        assert_eq!(value, serde_json::json!({"state": "loaded", "playback": "paused"}));
        let value = serde_json::to_value(PlayerState::Stopped).unwrap();
        assert_eq!(value, serde_json::json!({"state": "stopped"}));
    }
}
