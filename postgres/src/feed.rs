//! Cross-process change feed over `LISTEN`/`NOTIFY`.

use std::time::Duration;

use sqlx::postgres::PgListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use venue_booking_core::store::{StoreChange, StoreError};

use crate::{CHANGE_CHANNEL, PostgresDocumentStore};

/// Pause after the listener connection drops.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

impl PostgresDocumentStore {
    /// Start forwarding database notifications to local subscribers.
    ///
    /// Until this is called, subscribers receive nothing. The returned task
    /// runs until aborted; a dropped connection is re-established by the
    /// listener and changes sent while it was down are lost.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the listener cannot connect or
    /// subscribe to [`CHANGE_CHANNEL`].
    pub async fn start_change_feed(&self) -> Result<JoinHandle<()>, StoreError> {
        let mut listener = PgListener::connect_with(self.pool())
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect change listener: {e}")))?;
        listener
            .listen(CHANGE_CHANNEL)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to listen for changes: {e}")))?;

        tracing::info!(channel = CHANGE_CHANNEL, "Change feed started");

        let changes = self.changes.clone();
        Ok(tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => forward(&changes, notification.payload()),
                    Err(e) => {
                        tracing::warn!(error = %e, "Change feed connection lost");
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        }))
    }
}

fn decode(payload: &str) -> Option<StoreChange> {
    match serde_json::from_str(payload) {
        Ok(change) => Some(change),
        Err(e) => {
            tracing::warn!(error = %e, payload, "Ignoring malformed change notification");
            None
        }
    }
}

fn forward(changes: &broadcast::Sender<StoreChange>, payload: &str) {
    if let Some(change) = decode(payload) {
        // No receivers is not an error.
        let _ = changes.send(change);
    }
}
