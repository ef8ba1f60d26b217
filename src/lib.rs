//! embedmpv - session control for an mpv engine embedded in a host window
//!
//! The crate sits between an interface layer and a native playback engine:
//! - [`player`] validates intents against the session lifecycle
//! - [`speed`] and [`region`] own playback rate and video surface placement
//! - [`bridge`] carries commands to the engine in issue order
//! - [`status`] publishes the outcome of every operation

pub mod bridge;
pub mod engine;
pub mod player;
pub mod region;
pub mod speed;
pub mod status;
pub mod utils;

pub use bridge::CommandBridge;
pub use engine::{build_engine, Engine, EngineCommand, EngineReply, HeadlessEngine, HeadlessProbe};
pub use player::{
    Intent, MediaSource, Playback, PlayerSessionController, PlayerState, Presentation,
    SessionSnapshot,
};
pub use region::{RegionOutcome, RenderRegion};
pub use speed::{SpeedPresets, SpeedSetting};
pub use status::{Severity, StatusEvent, StatusReporter};
pub use utils::{Config, EngineError, PlayerError, Result, ValidationError};
