//! Live change feed over WebSocket.
//!
//! Clients keep their venue and booking listings current by re-reading the
//! documents named in each change. The feed is server-to-client only.
//!
//! # Message Protocol
//!
//! **Server → Client (Change):**
//! ```json
//! {
//!   "type": "change",
//!   "change": { "type": "venue_changed", "id": "…", "version": 3 }
//! }
//! ```
//!
//! **Server → Client (Lagged):** the client fell behind and missed `skipped`
//! changes; it should reload everything it shows.
//! ```json
//! { "type": "lagged", "skipped": 12 }
//! ```

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info};
use venue_booking_core::store::StoreChange;

use crate::extractors::CurrentUser;
use crate::state::AppState;

/// Message sent to feed subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedMessage {
    /// A venue or booking changed.
    Change {
        /// What changed.
        change: StoreChange,
    },
    /// Changes were dropped because the client was too slow.
    Lagged {
        /// Number of dropped changes.
        skipped: u64,
    },
}

/// `GET /api/changes` (WebSocket upgrade).
#[allow(clippy::unused_async)] // Axum handler signature requires async
pub async fn subscribe(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Response {
    info!(user_id = %identity.user_id, "Change feed connection requested");
    let changes = state.service().subscribe();
    ws.on_upgrade(move |socket| stream_changes(socket, changes))
}

/// Next message for the client, or `None` once the feed is closed.
async fn next_message(changes: &mut broadcast::Receiver<StoreChange>) -> Option<FeedMessage> {
    match changes.recv().await {
        Ok(change) => Some(FeedMessage::Change { change }),
        Err(RecvError::Lagged(skipped)) => Some(FeedMessage::Lagged { skipped }),
        Err(RecvError::Closed) => None,
    }
}

/// Forward changes until either side closes.
async fn stream_changes(socket: WebSocket, mut changes: broadcast::Receiver<StoreChange>) {
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = next_message(&mut changes).await {
            let text = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, "Failed to serialize change");
                    continue;
                }
            };

            if sender.send(Message::Text(text)).await.is_err() {
                // Client disconnected
                break;
            }
        }

        debug!("Change feed send task terminated");
    });

    // Incoming messages are ignored; the loop only watches for close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    info!("Change feed connection closed");
}
