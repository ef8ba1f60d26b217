//! Engine module for embedmpv
//!
//! The engine is the native decoder/renderer the session drives. Everything
//! the controller can ask of it is an [`EngineCommand`]; every answer is an
//! [`EngineReply`] or an [`EngineError`]. Backends implement [`Engine`] and
//! are owned by the command bridge's worker thread.

mod headless;
#[cfg(unix)]
mod mpv_ipc;

pub use headless::{HeadlessEngine, HeadlessProbe};
#[cfg(unix)]
pub use mpv_ipc::MpvIpcEngine;

use crate::region::RenderRegion;
use crate::utils::config::{EngineConfig, EngineKind};
use crate::utils::error::{EngineError, Result};
use serde::Serialize;
use std::fmt;

/// Engine trait implemented by every playback backend
pub trait Engine: Send + 'static {
    /// Execute a single command
    ///
    /// # Arguments
    ///
    /// * `command` - Command to run
    ///
    /// # Returns
    ///
    /// Returns the engine's reply, or the engine's failure message wrapped
    /// in an [`EngineError`]
    fn execute(&mut self, command: &EngineCommand) -> std::result::Result<EngineReply, EngineError>;

    /// Release engine resources; called once when the bridge shuts down
    fn shutdown(&mut self);
}

/// Command sent across the bridge
///
/// Serializes to the wire shape `{"command": "<name>", "args": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum EngineCommand {
    Init,
    Load {
        #[serde(rename = "filePath")]
        file_path: String,
    },
    PlayPause,
    Stop,
    SpeedPreset {
        speed: f64,
    },
    SetPlaybackSpeed {
        speed: f64,
    },
    GetPlaybackSpeed,
    SetupVideoRendering {
        #[serde(rename = "videoArea")]
        video_area: RenderRegion,
    },
}

impl EngineCommand {
    /// Logical command name
    pub fn name(&self) -> &'static str {
        match self {
            EngineCommand::Init => "init",
            EngineCommand::Load { .. } => "load",
            EngineCommand::PlayPause => "play_pause",
            EngineCommand::Stop => "stop",
            EngineCommand::SpeedPreset { .. } => "speed_preset",
            EngineCommand::SetPlaybackSpeed { .. } => "set_playback_speed",
            EngineCommand::GetPlaybackSpeed => "get_playback_speed",
            EngineCommand::SetupVideoRendering { .. } => "setup_video_rendering",
        }
    }
}

/// Successful engine answer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EngineReply {
    /// Human-readable confirmation
    Confirmation(String),

    /// Numeric query result
    Number(f64),
}

impl EngineReply {
    pub fn confirmation<S: Into<String>>(message: S) -> Self {
        EngineReply::Confirmation(message.into())
    }

    /// Numeric payload, if the reply carries one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            EngineReply::Number(value) => Some(*value),
            EngineReply::Confirmation(_) => None,
        }
    }
}

impl fmt::Display for EngineReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineReply::Confirmation(message) => f.write_str(message),
            EngineReply::Number(value) => write!(f, "{}", value),
        }
    }
}

/// Build the engine backend selected by configuration
pub fn build_engine(config: &EngineConfig) -> Result<Box<dyn Engine>> {
    match config.kind {
        EngineKind::Headless => Ok(Box::new(HeadlessEngine::new())),
        #[cfg(unix)]
        EngineKind::MpvIpc => Ok(Box::new(MpvIpcEngine::new(config.mpv.clone()))),
        #[cfg(not(unix))]
        EngineKind::MpvIpc => Err(crate::utils::error::PlayerError::Config(
            "The mpv-ipc engine is only available on unix platforms".to_string(),
        )),
    }
}
