//! Player session controller implementation for embedmpv
//!
//! This module provides the PlayerSessionController that validates intents
//! against the session state, serializes them, and routes engine work
//! through the speed controller, the region tracker and the command bridge.

use crate::bridge::CommandBridge;
use crate::engine::{build_engine, Engine, EngineCommand};
use crate::player::{
    Intent, MediaSource, Playback, PlayerState, Presentation, SessionSnapshot,
};
use crate::region::{RegionOutcome, RenderRegion, RenderRegionTracker};
use crate::speed::{SpeedController, SpeedPresets, SpeedSetting};
use crate::status::{StatusEvent, StatusReporter};
use crate::utils::config::Config;
use crate::utils::error::{EngineError, PlayerError, Result, ValidationError};

use log::{info, warn};
use tokio::sync::{watch, Mutex};

/// Everything mutated by intents; only reachable through the session lock
struct SessionCore {
    state: PlayerState,
    errored: bool,
    media: Option<MediaSource>,
    video_attached: bool,
    bridge: CommandBridge,
    speed: SpeedController,
    region: RenderRegionTracker,
    status: StatusReporter,
    snapshot: watch::Sender<SessionSnapshot>,
}

/// Top-level controller for one playback session
///
/// Intents are serialized: the session lock is held for the whole engine
/// round-trip, so an intent issued while another is in flight waits for it
/// and runs afterwards, in arrival order. Observations never wait.
pub struct PlayerSessionController {
    core: Mutex<SessionCore>,
    observer: watch::Receiver<SessionSnapshot>,
    status: StatusReporter,
    presets: SpeedPresets,
}

impl PlayerSessionController {
    /// Create a session for the engine selected in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let engine = build_engine(&config.engine)?;
        Self::new(engine, config)
    }

    /// Create a session driving `engine`
    ///
    /// # Arguments
    ///
    /// * `engine` - Engine backend; moved onto the bridge worker
    /// * `config` - Timeout and speed preset configuration
    pub fn new(engine: Box<dyn Engine>, config: &Config) -> Result<Self> {
        let presets = config.speed.presets()?;
        let bridge = CommandBridge::spawn(engine, config.engine.command_timeout())?;
        Ok(Self::with_bridge(bridge, presets))
    }

    /// Create a session on an existing bridge
    pub fn with_bridge(bridge: CommandBridge, presets: SpeedPresets) -> Self {
        let status = StatusReporter::new();
        let (snapshot, observer) = watch::channel(SessionSnapshot::default());

        let core = SessionCore {
            state: PlayerState::Uninitialized,
            errored: false,
            media: None,
            video_attached: false,
            speed: SpeedController::new(bridge.clone(), status.clone(), presets.clone()),
            region: RenderRegionTracker::new(bridge.clone(), status.clone()),
            bridge,
            status: status.clone(),
            snapshot,
        };

        Self {
            core: Mutex::new(core),
            observer,
            status,
            presets,
        }
    }

    /// Current observation of the session
    pub fn snapshot(&self) -> SessionSnapshot {
        self.observer.borrow().clone()
    }

    pub fn state(&self) -> PlayerState {
        self.observer.borrow().state
    }

    pub fn speed(&self) -> SpeedSetting {
        self.observer.borrow().speed
    }

    pub fn presets(&self) -> &SpeedPresets {
        &self.presets
    }

    /// Latest status event from any component
    pub fn latest_status(&self) -> Option<StatusEvent> {
        self.status.latest()
    }

    /// Status sink the interface layer subscribes to
    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    /// Subscribe to session snapshots
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.observer.clone()
    }

    /// Run any intent
    pub async fn dispatch(&self, intent: Intent) -> Result<()> {
        match intent {
            Intent::Initialize => self.initialize().await,
            Intent::LoadMedia(source) => self.load_media(source.path).await,
            Intent::TogglePlayPause => self.toggle_play_pause().await.map(|_| ()),
            Intent::Stop => self.stop().await,
            Intent::SetSpeedPreset(value) => self.set_speed_preset(value).await.map(|_| ()),
            Intent::SetCustomSpeed(value) => self.set_custom_speed(value).await.map(|_| ()),
            Intent::AdjustSpeed(delta) => self.adjust_speed(delta).await.map(|_| ()),
            Intent::ResetSpeed => self.reset_speed().await.map(|_| ()),
            Intent::QuerySpeed => self.query_speed().await.map(|_| ()),
            Intent::ReportGeometry(region) => self.report_geometry(region).await.map(|_| ()),
        }
    }

    /// Start the engine
    pub async fn initialize(&self) -> Result<()> {
        let mut core = self.core.lock().await;
        let result = core.initialize().await;
        core.publish();
        result
    }

    /// Load a media file; the session ends up paused
    ///
    /// # Arguments
    ///
    /// * `path` - Path handed to the engine as-is
    pub async fn load_media<S: Into<String>>(&self, path: S) -> Result<()> {
        let source = MediaSource::new(path);
        let mut core = self.core.lock().await;
        let result = core.load_media(source).await;
        core.publish();
        result
    }

    /// Toggle between playing and paused
    ///
    /// # Returns
    ///
    /// The playback sub-state after the engine confirmed the toggle
    pub async fn toggle_play_pause(&self) -> Result<Playback> {
        let mut core = self.core.lock().await;
        let result = core.toggle_play_pause().await;
        core.publish();
        result
    }

    /// Stop playback
    pub async fn stop(&self) -> Result<()> {
        let mut core = self.core.lock().await;
        let result = core.stop().await;
        core.publish();
        result
    }

    pub async fn set_speed_preset(&self, value: f64) -> Result<SpeedSetting> {
        let mut core = self.core.lock().await;
        let result = core.set_speed(Intent::SetSpeedPreset(value)).await;
        core.publish();
        result
    }

    pub async fn set_custom_speed(&self, value: f64) -> Result<SpeedSetting> {
        let mut core = self.core.lock().await;
        let result = core.set_speed(Intent::SetCustomSpeed(value)).await;
        core.publish();
        result
    }

    pub async fn adjust_speed(&self, delta: f64) -> Result<SpeedSetting> {
        let mut core = self.core.lock().await;
        let result = core.set_speed(Intent::AdjustSpeed(delta)).await;
        core.publish();
        result
    }

    pub async fn reset_speed(&self) -> Result<SpeedSetting> {
        let mut core = self.core.lock().await;
        let result = core.set_speed(Intent::ResetSpeed).await;
        core.publish();
        result
    }

    /// Adopt the engine's current speed
    pub async fn query_speed(&self) -> Result<SpeedSetting> {
        let mut core = self.core.lock().await;
        let result = core.set_speed(Intent::QuerySpeed).await;
        core.publish();
        result
    }

    /// Report the video surface geometry
    ///
    /// # Arguments
    ///
    /// * `region` - Surface rectangle in host-window coordinates
    pub async fn report_geometry(&self, region: RenderRegion) -> Result<RegionOutcome> {
        let mut core = self.core.lock().await;
        let result = core.report_geometry(region).await;
        core.publish();
        result
    }
}

impl SessionCore {
    async fn initialize(&mut self) -> Result<()> {
        if self.state.can_restart(self.errored) {
            info!("Restarting engine after a failure while {}", self.state);
        } else {
            self.gate(&Intent::Initialize)?;
        }
        self.transition(PlayerState::Initializing);

        match self.bridge.call(EngineCommand::Init).await {
            Ok(reply) => {
                self.errored = false;
                // A (re)started engine has no media and no video target
                self.media = None;
                self.video_attached = false;
                self.region.detach();
                self.speed.restore_default();
                self.transition(PlayerState::Initialized);
                self.status.success(reply.to_string());
            }
            Err(e) => {
                self.transition(PlayerState::Uninitialized);
                let err = self.fail(e);
                return self.record(Err(err));
            }
        }

        // Session start is when the engine's rate is adopted
        if let Err(e) = self.speed.query().await {
            warn!("Initial speed query failed: {}", e);
            self.errored = true;
        }

        Ok(())
    }

    async fn load_media(&mut self, source: MediaSource) -> Result<()> {
        self.gate(&Intent::LoadMedia(source.clone()))?;
        if source.path.trim().is_empty() {
            return Err(self.reject(ValidationError::EmptyPath));
        }

        let previous = self.state;
        self.transition(PlayerState::Loading);

        let command = EngineCommand::Load {
            file_path: source.path.clone(),
        };
        let reply = match self.bridge.call(command).await {
            Ok(reply) => reply,
            Err(e) => {
                self.transition(previous);
                let err = self.fail(e);
                return self.record(Err(err));
            }
        };

        self.errored = false;
        self.media = Some(source);
        self.video_attached = false;
        self.transition(PlayerState::Loaded(Playback::Paused));
        self.status.success(reply.to_string());

        match self.region.reapply().await {
            Ok(Some(region)) => {
                info!("Video attached to {}", region);
                self.video_attached = true;
            }
            Ok(None) => self.status.warning(
                "No video area known yet; audio will play without picture until the video surface is laid out",
            ),
            // Already reported by the tracker; the media itself is loaded
            Err(_) => self.errored = true,
        }

        Ok(())
    }

    async fn toggle_play_pause(&mut self) -> Result<Playback> {
        let current = match self.state {
            PlayerState::Loaded(playback) => playback,
            state => {
                return Err(self.reject(ValidationError::InvalidTransition {
                    intent: Intent::TogglePlayPause.name(),
                    state,
                }))
            }
        };

        match self.bridge.call(EngineCommand::PlayPause).await {
            Ok(reply) => {
                let next = current.toggled();
                self.errored = false;
                self.transition(PlayerState::Loaded(next));
                self.status.success(reply.to_string());
                Ok(next)
            }
            Err(e) => {
                let err = self.fail(e);
                self.record(Err(err))
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.gate(&Intent::Stop)?;

        match self.bridge.call(EngineCommand::Stop).await {
            Ok(reply) => {
                self.errored = false;
                self.media = None;
                self.video_attached = false;
                self.transition(PlayerState::Stopped);
                self.status.success(reply.to_string());
                Ok(())
            }
            Err(e) => {
                let err = self.fail(e);
                self.record(Err(err))
            }
        }
    }

    async fn set_speed(&mut self, intent: Intent) -> Result<SpeedSetting> {
        self.gate(&intent)?;

        let result = match intent {
            Intent::SetSpeedPreset(value) => self.speed.set_preset(value).await,
            Intent::SetCustomSpeed(value) => self.speed.set_custom(value).await,
            Intent::AdjustSpeed(delta) => self.speed.adjust(delta).await,
            Intent::ResetSpeed => self.speed.reset().await,
            Intent::QuerySpeed => self.speed.query().await,
            other => Err(PlayerError::Internal(format!(
                "{} is not a speed intent",
                other.name()
            ))),
        };

        self.record(result)
    }

    async fn report_geometry(&mut self, region: RenderRegion) -> Result<RegionOutcome> {
        if !self.state.engine_ready() {
            return self.region.retain(region);
        }

        let result = self.region.configure(region).await;
        if let Ok(RegionOutcome::Applied) = result {
            if self.state.is_loaded() {
                info!("Video attached to {}", region);
                self.video_attached = true;
            }
        }

        self.record(result)
    }

    /// Reject `intent` locally if the current state does not allow it
    fn gate(&self, intent: &Intent) -> Result<()> {
        self.state.check(intent).map_err(|e| self.reject(e))
    }

    fn reject(&self, err: ValidationError) -> PlayerError {
        let err = PlayerError::from(err);
        self.status.report_error(&err);
        err
    }

    fn fail(&self, err: EngineError) -> PlayerError {
        let err = PlayerError::from(err);
        self.status.report_error(&err);
        err
    }

    /// Track the errored flag from an intent's outcome
    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.errored = false,
            Err(PlayerError::Engine(_)) => self.errored = true,
            Err(_) => {}
        }
        result
    }

    fn transition(&mut self, next: PlayerState) {
        if self.state != next {
            info!("Player state: {} -> {}", self.state, next);
            self.state = next;
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.observe());
    }

    fn observe(&self) -> SessionSnapshot {
        let presentation = match self.state {
            PlayerState::Loaded(_) => match (self.video_attached, self.region.applied()) {
                (true, Some(region)) => Presentation::Attached(region),
                _ => Presentation::AudioOnly,
            },
            _ => Presentation::NoMedia,
        };

        SessionSnapshot {
            state: self.state,
            errored: self.errored,
            speed: self.speed.current(),
            region: self.region.known(),
            presentation,
            media: self.media.clone(),
        }
    }
}
