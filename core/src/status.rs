//! Venue status derivation.

use chrono::NaiveDate;

use crate::ledger::AvailabilityLedger;
use crate::types::{Venue, VenueStatus};

/// Compute a venue's display status from its ledger.
///
/// `Maintenance` is only ever set or cleared by an administrator and is
/// returned unchanged. Otherwise an empty ledger means `Available` and a
/// non-empty one means `Booked`.
#[must_use]
pub fn derive_status(previous: VenueStatus, ledger: &AvailabilityLedger) -> VenueStatus {
    match previous {
        VenueStatus::Maintenance => VenueStatus::Maintenance,
        _ if ledger.is_empty() => VenueStatus::Available,
        VenueStatus::Available | VenueStatus::Booked => VenueStatus::Booked,
    }
}

impl Venue {
    /// Prune expired dates and re-derive the status.
    ///
    /// Returns `true` when either the ledger or the status changed, meaning
    /// the venue should be written back.
    pub fn refresh_availability(&mut self, today: NaiveDate) -> bool {
        let pruned = self.availability.prune_expired(today);
        let status = derive_status(self.status, &self.availability);
        let status_changed = status != self.status;
        self.status = status;
        pruned || status_changed
    }
}
