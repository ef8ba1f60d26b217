//! Error types for embedmpv
//!
//! Two kinds of failure matter to a session: a [`ValidationError`] is raised
//! locally when an intent's precondition does not hold and never reaches the
//! engine, while an [`EngineError`] is something the engine reported (or
//! failed to report in time). Both fold into [`PlayerError`].

use crate::player::PlayerState;
use crate::status::Severity;
use std::time::Duration;
use thiserror::Error;

/// Main error type for embedmpv
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Local precondition failure; nothing was dispatched
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Failure reported by, or while talking to, the engine
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// Generic error for unexpected situations
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlayerError {
    /// Severity this error is surfaced with on the status channel
    pub fn severity(&self) -> Severity {
        match self {
            PlayerError::Validation(err) => err.severity(),
            _ => Severity::Error,
        }
    }

    /// Whether the error was raised locally, before any dispatch
    pub fn is_validation(&self) -> bool {
        matches!(self, PlayerError::Validation(_))
    }
}

/// Precondition failures detected before anything is sent to the engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The intent is not valid in the current lifecycle state
    #[error("Cannot {intent} while the player is {state}")]
    InvalidTransition {
        intent: &'static str,
        state: PlayerState,
    },

    /// LoadMedia was given an empty path
    #[error("No media file selected")]
    EmptyPath,

    /// Requested speed is outside the supported bound
    #[error("Speed must be between 0.1x and 4.0x (requested {speed})")]
    SpeedOutOfRange { speed: f64 },

    /// Requested preset is not in the configured preset set
    #[error("{speed}x is not one of the configured speed presets")]
    NotAPreset { speed: f64 },

    /// The video surface has not been laid out yet
    #[error("Video area {width}x{height} has no area yet; waiting for layout")]
    RegionNotReady { width: i32, height: i32 },

    /// Geometry with negative coordinates or size
    #[error("Video area {x},{y} {width}x{height} has negative components")]
    NegativeRegion {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
}

impl ValidationError {
    /// User-recoverable input is a warning; an unexpected state is an error
    pub fn severity(&self) -> Severity {
        match self {
            ValidationError::InvalidTransition { .. } => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

/// Failures on the engine side of the command bridge
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine refused or failed the command; `message` is verbatim
    #[error("{command} failed: {message}")]
    Rejected {
        command: &'static str,
        message: String,
    },

    /// No answer within the bridge timeout
    #[error("{command} failed: engine unresponsive after {timeout:?}")]
    Unresponsive {
        command: &'static str,
        timeout: Duration,
    },

    /// The bridge worker is gone
    #[error("{command} failed: engine connection closed")]
    Disconnected { command: &'static str },

    /// The engine answered with something the caller cannot use
    #[error("{command} returned an unexpected reply: {reply}")]
    UnexpectedReply {
        command: &'static str,
        reply: String,
    },
}

impl EngineError {
    /// Create a rejection for `command` with the engine's message
    pub fn rejected<S: Into<String>>(command: &'static str, message: S) -> Self {
        EngineError::Rejected {
            command,
            message: message.into(),
        }
    }

    /// Logical name of the command that failed
    pub fn command(&self) -> &'static str {
        match self {
            EngineError::Rejected { command, .. }
            | EngineError::Unresponsive { command, .. }
            | EngineError::Disconnected { command }
            | EngineError::UnexpectedReply { command, .. } => command,
        }
    }
}

/// Convenience type alias for Results in embedmpv
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Extension trait for converting other errors to PlayerError
pub trait IntoPlayerError<T> {
    /// Convert this error into a configuration error with the given context
    fn config_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoPlayerError<T> for std::result::Result<T, E> {
    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Config(format!("{}: {}", context, e)))
    }
}

/// Extension trait used by engine backends to wrap transport errors
pub trait IntoEngineError<T> {
    /// Convert this error into an engine rejection of `command`
    fn rejected(self, command: &'static str) -> std::result::Result<T, EngineError>;
}

impl<T, E: std::fmt::Display> IntoEngineError<T> for std::result::Result<T, E> {
    fn rejected(self, command: &'static str) -> std::result::Result<T, EngineError> {
        self.map_err(|e| EngineError::rejected(command, e.to_string()))
    }
}
