//! Injected collaborators other than storage.
//!
//! Pure code takes these as trait objects so tests can substitute fixed
//! clocks and recording sinks.

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date (UTC). Ledger pruning compares against this.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ============================================================================
// Attachment host
// ============================================================================

/// A file supplied with a booking request or venue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Original file name.
    pub file_name: String,
    /// MIME type, e.g. `application/pdf`.
    pub content_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Upload failure. Callers degrade to "no attachment" instead of failing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachmentError {
    /// No host is configured.
    #[error("attachment upload is not configured")]
    NotConfigured,

    /// The host refused the file.
    #[error("attachment rejected: {0}")]
    Rejected(String),

    /// The host could not be reached.
    #[error("attachment upload failed: {0}")]
    Transport(String),
}

/// Third-party file host returning a public URL.
pub trait AttachmentHost: Send + Sync {
    /// Upload `attachment` and return where it can be retrieved.
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError`] when the upload does not complete.
    fn upload(&self, attachment: Attachment) -> BoxFuture<'_, Result<String, AttachmentError>>;
}

/// Host used when uploads are not configured; every upload fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledAttachmentHost;

impl AttachmentHost for DisabledAttachmentHost {
    fn upload(&self, _attachment: Attachment) -> BoxFuture<'_, Result<String, AttachmentError>> {
        Box::pin(async { Err(AttachmentError::NotConfigured) })
    }
}

// ============================================================================
// Notification sink
// ============================================================================

/// How a transient notice should be presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Operation succeeded.
    Success,
    /// Operation failed or was refused.
    Error,
    /// Informational.
    Info,
}

impl Severity {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// Fire-and-forget user notifications.
pub trait NotificationSink: Send + Sync {
    /// Show a transient message.
    fn notify(&self, message: &str, severity: Severity);

    /// Optionally speak `text`.
    fn announce(&self, text: &str);
}
