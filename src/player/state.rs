//! Session state rules and observations
//!
//! The transition table lives here as pure functions so that it can be
//! checked without an engine.

use crate::player::{Intent, MediaSource, PlayerState, Presentation};
use crate::region::RenderRegion;
use crate::speed::SpeedSetting;
use crate::utils::error::ValidationError;
use serde::Serialize;

impl PlayerState {
    /// Whether the engine has been initialized and not torn down
    pub fn engine_ready(&self) -> bool {
        matches!(
            self,
            PlayerState::Initialized | PlayerState::Loaded(_) | PlayerState::Stopped
        )
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, PlayerState::Loaded(_))
    }

    /// Whether a failed engine may be restarted from this state
    ///
    /// Any ready state qualifies once an engine call has failed; the gate of
    /// [`check`](Self::check) still applies to a healthy session.
    pub fn can_restart(&self, errored: bool) -> bool {
        errored && self.engine_ready()
    }

    /// Check whether `intent` may be issued in this state
    ///
    /// # Returns
    ///
    /// `InvalidTransition` when the intent's precondition does not hold
    pub fn check(&self, intent: &Intent) -> Result<(), ValidationError> {
        let allowed = match intent {
            Intent::Initialize => {
                matches!(self, PlayerState::Uninitialized | PlayerState::Stopped)
            }
            Intent::LoadMedia(_) => matches!(
                self,
                PlayerState::Initialized | PlayerState::Stopped | PlayerState::Loaded(_)
            ),
            Intent::TogglePlayPause => self.is_loaded(),
            Intent::Stop => matches!(self, PlayerState::Initialized | PlayerState::Loaded(_)),
            Intent::SetSpeedPreset(_)
            | Intent::SetCustomSpeed(_)
            | Intent::AdjustSpeed(_)
            | Intent::ResetSpeed
            | Intent::QuerySpeed => self.engine_ready(),
            // Held until the engine is ready
            Intent::ReportGeometry(_) => true,
        };

        if allowed {
            Ok(())
        } else {
            Err(ValidationError::InvalidTransition {
                intent: intent.name(),
                state: *self,
            })
        }
    }
}

/// Read-only view of a session, published after every change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: PlayerState,

    /// Set by the last engine failure, cleared by the next successful intent
    pub errored: bool,

    pub speed: SpeedSetting,
    pub region: Option<RenderRegion>,
    pub presentation: Presentation,
    pub media: Option<MediaSource>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: PlayerState::Uninitialized,
            errored: false,
            speed: SpeedSetting::default(),
            region: None,
            presentation: Presentation::NoMedia,
            media: None,
        }
    }
}
