//! Notification sink: where user-facing messages go.

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Displays `(message, severity)` to the user. Implementations decide how
/// long a message stays visible.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Sink that forwards notifications to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Success | Severity::Info => tracing::info!(target: "scene_client::notify", "{message}"),
            Severity::Warning => tracing::warn!(target: "scene_client::notify", "{message}"),
            Severity::Error => tracing::error!(target: "scene_client::notify", "{message}"),
        }
    }
}
