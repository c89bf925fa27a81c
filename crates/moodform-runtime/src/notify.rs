#![forbid(unsafe_code)]

//! Notification side-channel.
//!
//! The engine reports user-facing events (restore confirmation, validation
//! failure, persistence failure) through this seam; how the host renders
//! them is out of scope.

use std::fmt;

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Routine confirmation.
    Info,
    /// Needs attention, not blocking.
    Warning,
    /// Something was lost or blocked.
    Danger,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        };
        f.write_str(s)
    }
}

/// Where engine notifications go.
pub trait NotificationSink {
    /// Deliver one message at the given severity.
    fn notify(&mut self, message: &str, severity: Severity);
}

/// Routes notifications to `tracing` at matching levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&mut self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => tracing::info!(target: "moodform::notify", "{message}"),
            Severity::Warning => tracing::warn!(target: "moodform::notify", "{message}"),
            Severity::Danger => tracing::error!(target: "moodform::notify", "{message}"),
        }
    }
}

/// Collects notifications for assertions in tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    /// Delivered messages in arrival order.
    pub messages: Vec<(String, Severity)>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any message of the given severity was delivered.
    #[must_use]
    pub fn has_severity(&self, severity: Severity) -> bool {
        self.messages.iter().any(|(_, s)| *s == severity)
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&mut self, message: &str, severity: Severity) {
        self.messages.push((message.to_string(), severity));
    }
}
