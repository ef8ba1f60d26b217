//! Playback speed control for embedmpv
//!
//! Speeds live in `[MIN_SPEED, MAX_SPEED]` at two-decimal granularity.
//! Out-of-range requests are rejected, never clamped; only `adjust` clamps,
//! because a relative nudge has no explicit target the user could mean.
//! Local state follows the engine: it changes only after the engine confirms.

use crate::bridge::CommandBridge;
use crate::engine::EngineCommand;
use crate::status::StatusReporter;
use crate::utils::error::{EngineError, PlayerError, Result, ValidationError};
use crate::utils::{approx_eq, round_hundredths};
use log::debug;
use serde::Serialize;
use std::fmt;

/// Slowest supported rate
pub const MIN_SPEED: f64 = 0.1;

/// Fastest supported rate
pub const MAX_SPEED: f64 = 4.0;

/// Normal playback rate
pub const DEFAULT_SPEED: f64 = 1.0;

/// Presets offered when configuration does not override them
pub const DEFAULT_PRESETS: [f64; 7] = [0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// A playback rate known to be within bounds
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct SpeedSetting(f64);

impl SpeedSetting {
    /// Validate `value` and round it to hundredths
    pub fn new(value: f64) -> std::result::Result<Self, ValidationError> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&value) {
            return Err(ValidationError::SpeedOutOfRange { speed: value });
        }
        Ok(Self(round_hundredths(value)))
    }

    /// Accept a rate reported by the engine as-is, checking only the bounds
    pub fn reported(value: f64) -> std::result::Result<Self, ValidationError> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&value) {
            return Err(ValidationError::SpeedOutOfRange { speed: value });
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for SpeedSetting {
    fn default() -> Self {
        Self(DEFAULT_SPEED)
    }
}

impl fmt::Display for SpeedSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}x", self.0)
    }
}

/// Ascending set of preset rates
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedPresets(Vec<f64>);

impl SpeedPresets {
    /// Build a preset set
    ///
    /// # Returns
    ///
    /// A configuration error unless the list is non-empty, strictly
    /// ascending, and every value is within bounds with at most two decimals
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(PlayerError::Config("Speed presets must not be empty".to_string()));
        }
        if let Some(bad) = values.iter().find(|v| !(MIN_SPEED..=MAX_SPEED).contains(*v)) {
            return Err(PlayerError::Config(format!(
                "Speed preset {} is outside {}..={}",
                bad, MIN_SPEED, MAX_SPEED
            )));
        }
        if let Some(bad) = values.iter().find(|v| !approx_eq(round_hundredths(**v), **v)) {
            return Err(PlayerError::Config(format!(
                "Speed preset {} has more than two decimals",
                bad
            )));
        }
        if values.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(PlayerError::Config(
                "Speed presets must be strictly ascending".to_string(),
            ));
        }
        Ok(Self(values))
    }

    pub fn contains(&self, value: f64) -> bool {
        self.0.iter().any(|preset| approx_eq(*preset, value))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Default for SpeedPresets {
    fn default() -> Self {
        Self(DEFAULT_PRESETS.to_vec())
    }
}

/// Owns the current and in-flight playback rate
pub struct SpeedController {
    bridge: CommandBridge,
    status: StatusReporter,
    presets: SpeedPresets,
    current: SpeedSetting,
    pending: Option<SpeedSetting>,
}

impl SpeedController {
    pub fn new(bridge: CommandBridge, status: StatusReporter, presets: SpeedPresets) -> Self {
        Self {
            bridge,
            status,
            presets,
            current: SpeedSetting::default(),
            pending: None,
        }
    }

    /// Rate last confirmed by the engine
    pub fn current(&self) -> SpeedSetting {
        self.current
    }

    /// Rate dispatched but not yet confirmed
    pub fn pending(&self) -> Option<SpeedSetting> {
        self.pending
    }

    /// Forget the local rate; a freshly started engine runs at normal speed
    pub fn restore_default(&mut self) {
        self.current = SpeedSetting::default();
        self.pending = None;
    }

    /// Switch to one of the configured presets
    ///
    /// # Arguments
    ///
    /// * `value` - Preset rate; must be a member of the preset set
    pub async fn set_preset(&mut self, value: f64) -> Result<SpeedSetting> {
        if !self.presets.contains(value) {
            return Err(self.reject(ValidationError::NotAPreset { speed: value }));
        }
        let setting = SpeedSetting::new(value).map_err(|e| self.reject(e))?;
        self.dispatch(EngineCommand::SpeedPreset { speed: setting.value() }, setting)
            .await
    }

    /// Set an arbitrary rate within bounds
    ///
    /// # Arguments
    ///
    /// * `value` - Requested rate; rejected without dispatch when out of range
    pub async fn set_custom(&mut self, value: f64) -> Result<SpeedSetting> {
        let setting = SpeedSetting::new(value).map_err(|e| self.reject(e))?;
        self.dispatch(
            EngineCommand::SetPlaybackSpeed {
                speed: setting.value(),
            },
            setting,
        )
        .await
    }

    /// Nudge the rate by `delta`, clamped into bounds
    pub async fn adjust(&mut self, delta: f64) -> Result<SpeedSetting> {
        let target = (self.current.value() + delta).clamp(MIN_SPEED, MAX_SPEED);
        self.set_custom(target).await
    }

    /// Return to normal speed
    pub async fn reset(&mut self) -> Result<SpeedSetting> {
        self.set_custom(DEFAULT_SPEED).await
    }

    /// Ask the engine for its rate and adopt it
    pub async fn query(&mut self) -> Result<SpeedSetting> {
        let command = EngineCommand::GetPlaybackSpeed;
        let name = command.name();

        let reply = match self.bridge.call(command).await {
            Ok(reply) => reply,
            Err(e) => return Err(self.fail(e)),
        };

        let setting = match reply.as_number().map(SpeedSetting::reported) {
            Some(Ok(setting)) => setting,
            _ => {
                return Err(self.fail(EngineError::UnexpectedReply {
                    command: name,
                    reply: reply.to_string(),
                }))
            }
        };

        if setting != self.current {
            debug!("Engine speed {} replaces local {}", setting, self.current);
        }
        self.current = setting;
        self.status.info(format!("Playback speed is {}", setting));
        Ok(setting)
    }

    async fn dispatch(&mut self, command: EngineCommand, setting: SpeedSetting) -> Result<SpeedSetting> {
        self.pending = Some(setting);
        let outcome = self.bridge.call(command).await;
        self.pending = None;

        match outcome {
            Ok(reply) => {
                self.current = setting;
                self.status.success(reply.to_string());
                Ok(setting)
            }
            Err(e) => Err(self.fail(e)),
        }
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
}
