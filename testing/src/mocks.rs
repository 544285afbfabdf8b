//! Test doubles for the environment traits.

#![allow(clippy::unwrap_used)] // Poisoned test locks should fail the test

use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use venue_booking_core::environment::{
    Attachment, AttachmentError, AttachmentHost, Clock, NotificationSink, Severity,
};

// ============================================================================
// Clock
// ============================================================================

/// Settable clock for deterministic tests.
///
/// Clones share the same instant, so a test can keep one handle and move
/// time forward under a service that holds another.
///
/// # Example
///
/// ```
/// use venue_booking_testing::mocks::FixedClock;
/// use venue_booking_core::environment::Clock;
/// use chrono::{Duration, Utc};
///
/// let clock = FixedClock::new(Utc::now());
/// let before = clock.now();
/// clock.advance(Duration::days(1));
/// assert_eq!(clock.now() - before, Duration::days(1));
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: Arc<RwLock<DateTime<Utc>>>,
}

impl FixedClock {
    /// Clock stopped at `time`.
    #[must_use]
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: Arc::new(RwLock::new(time)),
        }
    }

    /// Move to `time`.
    pub fn set(&self, time: DateTime<Utc>) {
        *self.time.write().unwrap() = time;
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut time = self.time.write().unwrap();
        *time += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.read().unwrap()
    }
}

/// Default test clock: 2025-05-20 08:00:00 UTC.
#[must_use]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2025-05-20T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc),
    )
}

// ============================================================================
// Notification sink
// ============================================================================

/// Captures every notice and announcement.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(String, Severity)>>,
    announcements: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices in the order they were shown.
    #[must_use]
    pub fn notices(&self) -> Vec<(String, Severity)> {
        self.notices.lock().unwrap().clone()
    }

    /// Notice texts only.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.notices().into_iter().map(|(message, _)| message).collect()
    }

    /// Whether a notice with exactly `message` was shown.
    #[must_use]
    pub fn saw(&self, message: &str) -> bool {
        self.notices.lock().unwrap().iter().any(|(m, _)| m == message)
    }

    /// Spoken texts in order.
    #[must_use]
    pub fn announcements(&self) -> Vec<String> {
        self.announcements.lock().unwrap().clone()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.notices.lock().unwrap().clear();
        self.announcements.lock().unwrap().clear();
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.notices
            .lock()
            .unwrap()
            .push((message.to_string(), severity));
    }

    fn announce(&self, text: &str) {
        self.announcements.lock().unwrap().push(text.to_string());
    }
}

// ============================================================================
// Attachment host
// ============================================================================

/// Attachment host with a scripted result.
#[derive(Debug)]
pub struct StubAttachmentHost {
    result: Result<String, AttachmentError>,
    uploads: AtomicUsize,
}

impl StubAttachmentHost {
    /// Every upload succeeds with `{base_url}/{file_name}`.
    #[must_use]
    pub fn succeeding(base_url: impl Into<String>) -> Self {
        Self {
            result: Ok(base_url.into()),
            uploads: AtomicUsize::new(0),
        }
    }

    /// Every upload fails with `error`.
    #[must_use]
    pub const fn failing(error: AttachmentError) -> Self {
        Self {
            result: Err(error),
            uploads: AtomicUsize::new(0),
        }
    }

    /// Upload attempts so far.
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

impl AttachmentHost for StubAttachmentHost {
    fn upload(&self, attachment: Attachment) -> BoxFuture<'_, Result<String, AttachmentError>> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let result = self
            .result
            .clone()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), attachment.file_name));
        Box::pin(async move { result })
    }
}
