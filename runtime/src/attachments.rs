//! Attachment host backed by a local directory.
//!
//! Files are written under `dir` with a random prefix and published as
//! `{public_url}/{stored_name}`. Serving `dir` at `public_url` is left to
//! whatever fronts the deployment (reverse proxy, object store sync).

use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use venue_booking_core::environment::{Attachment, AttachmentError, AttachmentHost};

/// Writes attachments to a directory and returns their public URL.
#[derive(Clone, Debug)]
pub struct DirectoryAttachmentHost {
    dir: PathBuf,
    public_url: String,
}

impl DirectoryAttachmentHost {
    /// Host storing files in `dir`, reachable under `public_url`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Directory files are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Last path component of `file_name`, limited to URL-safe characters.
fn sanitize(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

impl AttachmentHost for DirectoryAttachmentHost {
    fn upload(&self, attachment: Attachment) -> BoxFuture<'_, Result<String, AttachmentError>> {
        Box::pin(async move {
            if attachment.bytes.is_empty() {
                return Err(AttachmentError::Rejected("file is empty".to_string()));
            }
            let name = sanitize(&attachment.file_name).ok_or_else(|| {
                AttachmentError::Rejected(format!("unusable file name {:?}", attachment.file_name))
            })?;
            let stored_name = format!("{:016x}-{name}", rand::random::<u64>());

            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| AttachmentError::Transport(e.to_string()))?;
            tokio::fs::write(self.dir.join(&stored_name), &attachment.bytes)
                .await
                .map_err(|e| AttachmentError::Transport(e.to_string()))?;

            tracing::debug!(
                file_name = %attachment.file_name,
                stored_name = %stored_name,
                bytes = attachment.bytes.len(),
                "Attachment stored"
            );
            Ok(format!("{}/{stored_name}", self.public_url))
        })
    }
}
