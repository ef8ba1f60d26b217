//! Headless engine implementation
//!
//! Simulates the observable behaviour of an embedded mpv instance without
//! decoding anything. Used for the console's headless mode and as the
//! engine behind the crate's tests; [`HeadlessProbe`] gives tests a view of
//! the call log and lets them inject faults and latency.

use crate::engine::{Engine, EngineCommand, EngineReply};
use crate::region::RenderRegion;
use crate::speed::{MAX_SPEED, MIN_SPEED};
use crate::utils::error::EngineError;
use log::debug;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Simulated engine state
#[derive(Debug)]
struct HeadlessState {
    initialized: bool,
    media: Option<String>,
    paused: bool,
    speed: f64,
    video_area: Option<RenderRegion>,
    calls: Vec<EngineCommand>,
    faults: VecDeque<(&'static str, String)>,
    latency: Duration,
    shut_down: bool,
}

impl Default for HeadlessState {
    fn default() -> Self {
        Self {
            initialized: false,
            media: None,
            paused: true,
            speed: 1.0,
            video_area: None,
            calls: Vec::new(),
            faults: VecDeque::new(),
            latency: Duration::ZERO,
            shut_down: false,
        }
    }
}

/// In-process engine with no video output
pub struct HeadlessEngine {
    state: Arc<Mutex<HeadlessState>>,
}

/// Inspection and fault-injection handle for a [`HeadlessEngine`]
#[derive(Clone)]
pub struct HeadlessProbe {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState::default())),
        }
    }

    /// Handle that stays valid after the engine moves into a bridge
    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for HeadlessEngine {
    fn execute(&mut self, command: &EngineCommand) -> Result<EngineReply, EngineError> {
        let latency = {
            let mut state = self.state.lock();
            state.calls.push(command.clone());
            state.latency
        };

        if !latency.is_zero() {
            std::thread::sleep(latency);
        }

        let mut state = self.state.lock();
        let name = command.name();

        if let Some(index) = state.faults.iter().position(|(target, _)| *target == name) {
            if let Some((_, message)) = state.faults.remove(index) {
                debug!("Headless engine failing {} on request", name);
                return Err(EngineError::rejected(name, message));
            }
        }

        if !state.initialized && !matches!(command, EngineCommand::Init) {
            return Err(EngineError::rejected(name, "Engine not initialized"));
        }

        match command {
            EngineCommand::Init => {
                // Re-initializing starts over without media
                state.initialized = true;
                state.media = None;
                state.paused = true;
                state.video_area = None;
                Ok(EngineReply::confirmation("Headless engine initialized"))
            }

            EngineCommand::Load { file_path } => {
                state.media = Some(file_path.clone());
                state.paused = true;
                Ok(EngineReply::confirmation(format!("Loading video: {}", file_path)))
            }

            EngineCommand::PlayPause => {
                if state.media.is_none() {
                    return Err(EngineError::rejected(name, "No media loaded"));
                }
                state.paused = !state.paused;
                let label = if state.paused { "Paused" } else { "Playing" };
                Ok(EngineReply::confirmation(label))
            }

            EngineCommand::Stop => {
                state.media = None;
                state.paused = true;
                Ok(EngineReply::confirmation("Stopped"))
            }

            EngineCommand::SpeedPreset { speed } | EngineCommand::SetPlaybackSpeed { speed } => {
                if !(MIN_SPEED..=MAX_SPEED).contains(speed) {
                    return Err(EngineError::rejected(
                        name,
                        format!("Speed {} is outside the supported range", speed),
                    ));
                }
                state.speed = *speed;
                Ok(EngineReply::confirmation(format!("Speed set to {:.2}x", speed)))
            }

            EngineCommand::GetPlaybackSpeed => Ok(EngineReply::Number(state.speed)),

            EngineCommand::SetupVideoRendering { video_area } => {
                if !video_area.has_area() {
                    return Err(EngineError::rejected(name, "Invalid video area"));
                }
                state.video_area = Some(*video_area);
                Ok(EngineReply::confirmation(format!(
                    "Video will render in app at {}x{}",
                    video_area.width, video_area.height
                )))
            }
        }
    }

    fn shutdown(&mut self) {
        let mut state = self.state.lock();
        state.shut_down = true;
        state.initialized = false;
        state.media = None;
    }
}

impl HeadlessProbe {
    /// Every command the engine received, in order
    pub fn calls(&self) -> Vec<EngineCommand> {
        self.state.lock().calls.clone()
    }

    /// Number of commands received
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Number of commands received with the given logical name
    pub fn count_of(&self, name: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| c.name() == name).count()
    }

    /// Fail the next command named `command` with `message`
    pub fn fail_next<S: Into<String>>(&self, command: &'static str, message: S) {
        self.state.lock().faults.push_back((command, message.into()));
    }

    /// Delay every subsequent command by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }

    /// Change the speed on the engine side, as a user acting on mpv directly would
    pub fn set_engine_speed(&self, speed: f64) {
        self.state.lock().speed = speed;
    }

    pub fn engine_speed(&self) -> f64 {
        self.state.lock().speed
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn media(&self) -> Option<String> {
        self.state.lock().media.clone()
    }

    pub fn video_area(&self) -> Option<RenderRegion> {
        self.state.lock().video_area
    }

    /// Whether the owning bridge has shut the engine down
    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }
}
