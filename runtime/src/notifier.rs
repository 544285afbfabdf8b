//! Notification sink that writes notices to the log.

use venue_booking_core::environment::{NotificationSink, Severity};

/// Logs every notice through `tracing`.
///
/// Used when no front end is attached to receive toasts.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Error => tracing::warn!(severity = severity.as_str(), "{message}"),
            Severity::Success | Severity::Info => {
                tracing::info!(severity = severity.as_str(), "{message}");
            }
        }
    }

    fn announce(&self, text: &str) {
        tracing::debug!(speech = text, "Announcement");
    }
}
