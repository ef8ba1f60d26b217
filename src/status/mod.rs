//! Status reporting for embedmpv
//!
//! Every component writes the outcome of its operations here; the interface
//! layer reads the latest event or subscribes to changes. Only the most
//! recent event is kept.

use crate::utils::error::PlayerError;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Severity of a status event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

/// Outcome of a single operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub severity: Severity,
    pub message: String,
}

impl StatusEvent {
    pub fn new<S: Into<String>>(severity: Severity, message: S) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Observation sink shared by all session components
///
/// Cloning is cheap; all clones write to and read from the same slot.
#[derive(Clone)]
pub struct StatusReporter {
    latest: Arc<watch::Sender<Option<StatusEvent>>>,
}

impl StatusReporter {
    /// Create a reporter with no event yet
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            latest: Arc::new(latest),
        }
    }

    /// Replace the latest event and mirror it to the log
    pub fn report<S: Into<String>>(&self, severity: Severity, message: S) {
        let event = StatusEvent::new(severity, message);
        match event.severity {
            Severity::Info | Severity::Success => info!("{}", event.message),
            Severity::Warning => warn!("{}", event.message),
            Severity::Error => error!("{}", event.message),
        }
        self.latest.send_replace(Some(event));
    }

    pub fn info<S: Into<String>>(&self, message: S) {
        self.report(Severity::Info, message);
    }

    pub fn success<S: Into<String>>(&self, message: S) {
        self.report(Severity::Success, message);
    }

    pub fn warning<S: Into<String>>(&self, message: S) {
        self.report(Severity::Warning, message);
    }

    /// Report an error with the severity it maps to
    pub fn report_error(&self, err: &PlayerError) {
        self.report(err.severity(), err.to_string());
    }

    /// Most recent event, if any
    pub fn latest(&self) -> Option<StatusEvent> {
        self.latest.borrow().clone()
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> watch::Receiver<Option<StatusEvent>> {
        self.latest.subscribe()
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ValidationError;

    #[test]
    fn test_latest_replaces_previous() {
        let reporter = StatusReporter::new();
        assert!(reporter.latest().is_none());

        reporter.info("Engine starting");
        reporter.success("Engine initialized");

        let latest = reporter.latest().unwrap();
        assert_eq!(latest.severity, Severity::Success);
        assert_eq!(latest.message, "Engine initialized");
    }

    #[test]
    fn test_clones_share_slot() {
        let reporter = StatusReporter::new();
        let clone = reporter.clone();
        clone.warning("No media file selected");
        assert_eq!(reporter.latest().unwrap().severity, Severity::Warning);
    }

    #[test]
    fn test_report_error_uses_mapped_severity() {
        let reporter = StatusReporter::new();
        reporter.report_error(&PlayerError::from(ValidationError::EmptyPath));
        let latest = reporter.latest().unwrap();
        assert_eq!(latest.severity, Severity::Warning);
        assert_eq!(latest.message, "No media file selected");
    }

    #[tokio::test]
    async fn test_subscriber_sees_change() {
        let reporter = StatusReporter::new();
        let mut rx = reporter.subscribe();

        reporter.success("Stopped");
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow().clone(),
            Some(StatusEvent::new(Severity::Success, "Stopped"))
        );
    }

    #[test]
    fn test_event_display() {
        let event = StatusEvent::new(Severity::Error, "load failed: file missing");
        assert_eq!(event.to_string(), "[error] load failed: file missing");
    }
}
