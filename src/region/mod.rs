//! Render region tracking for embedmpv
//!
//! The interface reports where the video surface sits in the host window
//! whenever layout changes. The tracker turns those reports into
//! `setup_video_rendering` commands, skipping reports that change nothing.

use crate::bridge::CommandBridge;
use crate::engine::EngineCommand;
use crate::status::StatusReporter;
use crate::utils::error::{PlayerError, Result, ValidationError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host-window-relative rectangle handed to the engine for compositing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl RenderRegion {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether both dimensions are positive
    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Check the region can be handed to the engine
    ///
    /// # Returns
    ///
    /// `NegativeRegion` for negative components, `RegionNotReady` for a
    /// zero-area surface that has not been laid out yet
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.x < 0 || self.y < 0 || self.width < 0 || self.height < 0 {
            return Err(ValidationError::NegativeRegion {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
            });
        }
        if !self.has_area() {
            return Err(ValidationError::RegionNotReady {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Formats as an mpv geometry string, `WxH+X+Y`
impl fmt::Display for RenderRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Result of a geometry report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionOutcome {
    /// Configuration was dispatched and confirmed
    Applied,

    /// Same as the region already applied; nothing dispatched
    Unchanged,

    /// Stored for later; the engine is not ready for it
    Held,
}

/// Tracks the last known and last applied render region
pub struct RenderRegionTracker {
    bridge: CommandBridge,
    status: StatusReporter,
    known: Option<RenderRegion>,
    applied: Option<RenderRegion>,
}

impl RenderRegionTracker {
    pub fn new(bridge: CommandBridge, status: StatusReporter) -> Self {
        Self {
            bridge,
            status,
            known: None,
            applied: None,
        }
    }

    /// Last valid region reported by the interface
    pub fn known(&self) -> Option<RenderRegion> {
        self.known
    }

    /// Region the engine last confirmed
    pub fn applied(&self) -> Option<RenderRegion> {
        self.applied
    }

    /// Forget what the engine was configured with; the known region stays
    pub fn detach(&mut self) {
        self.applied = None;
    }

    /// Configure the engine for `region`, skipping unchanged reports
    ///
    /// # Arguments
    ///
    /// * `region` - Current geometry of the video surface
    pub async fn configure(&mut self, region: RenderRegion) -> Result<RegionOutcome> {
        self.accept(region)?;

        if self.applied == Some(region) {
            debug!("Render region {} unchanged, skipping", region);
            return Ok(RegionOutcome::Unchanged);
        }

        self.apply(region).await?;
        Ok(RegionOutcome::Applied)
    }

    /// Validate and remember `region` without contacting the engine
    pub fn retain(&mut self, region: RenderRegion) -> Result<RegionOutcome> {
        self.accept(region)?;
        self.status
            .info(format!("Video area {} held until the engine is ready", region));
        Ok(RegionOutcome::Held)
    }

    /// Re-issue the known region unconditionally
    ///
    /// # Returns
    ///
    /// The region that was applied, or `None` when no region is known yet
    pub async fn reapply(&mut self) -> Result<Option<RenderRegion>> {
        match self.known {
            Some(region) => {
                self.apply(region).await?;
                Ok(Some(region))
            }
            None => Ok(None),
        }
    }

    fn accept(&mut self, region: RenderRegion) -> Result<()> {
        if let Err(e) = region.validate() {
            let err = PlayerError::from(e);
            self.status.report_error(&err);
            return Err(err);
        }
        self.known = Some(region);
        Ok(())
    }

    async fn apply(&mut self, region: RenderRegion) -> Result<()> {
        let command = EngineCommand::SetupVideoRendering { video_area: region };
        match self.bridge.call(command).await {
            Ok(reply) => {
                self.applied = Some(region);
                self.status.success(reply.to_string());
                Ok(())
            }
            Err(e) => {
                // Force the next report to dispatch again
                self.applied = None;
                let err = PlayerError::from(e);
                self.status.report_error(&err);
                Err(err)
            }
        }
    }
}
