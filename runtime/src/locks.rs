//! Per-venue mutual exclusion.
//!
//! Reviews against the same venue are serialised inside one process, so two
//! approvals never check the ledger against the same snapshot. Across
//! processes the venue version check covers the same race.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use venue_booking_core::VenueId;

/// Idle locks are dropped once the table grows past this size.
const SWEEP_THRESHOLD: usize = 1024;

/// Async lock table keyed by venue.
#[derive(Debug, Default)]
pub struct VenueLocks {
    table: Mutex<HashMap<VenueId, Arc<Mutex<()>>>>,
}

impl VenueLocks {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `venue_id`.
    ///
    /// The returned guard releases the venue when dropped.
    pub async fn acquire(&self, venue_id: VenueId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock().await;
            if table.len() > SWEEP_THRESHOLD {
                table.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(table.entry(venue_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of venues with a lock entry.
    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    /// True when no lock entries exist.
    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.is_empty()
    }
}
