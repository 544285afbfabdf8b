//! Booking request submission.
//!
//! A request names one venue, one date and one or more slots. Each slot
//! becomes its own pending [`Booking`] so that reviewers can approve or
//! reject slots independently.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::environment::Attachment;
use crate::error::BookingError;
use crate::ledger::AvailabilityLedger;
use crate::slot::Slot;
use crate::types::{Booking, BookingId, BookingStatus, Identity, Venue, VenueId};

/// Notice shown after a request is stored.
pub const SUBMITTED_MESSAGE: &str = "Booking request submitted successfully!";

/// A user's booking request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBooking {
    /// Requested venue.
    pub venue_id: VenueId,
    /// Requested date.
    pub date: NaiveDate,
    /// One or more slots on that date.
    pub slots: Vec<Slot>,
    /// Why the venue is needed.
    pub purpose: String,
    /// Optional supporting document, uploaded before the bookings are stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl SubmitBooking {
    /// Check the request on its own, before touching storage.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] when no slot is selected, a slot
    /// is repeated, the purpose is blank, or the date is in the past.
    pub fn validate(&self, today: NaiveDate) -> Result<(), BookingError> {
        if self.slots.is_empty() {
            return Err(BookingError::Validation(
                "please select at least one time slot".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(self.slots.len());
        if let Some(repeated) = self.slots.iter().find(|slot| !seen.insert(**slot)) {
            return Err(BookingError::Validation(format!(
                "time slot {repeated} is selected more than once"
            )));
        }
        if self.purpose.trim().is_empty() {
            return Err(BookingError::Validation(
                "please describe the purpose of the booking".to_string(),
            ));
        }
        if self.date < today {
            return Err(BookingError::Validation(format!(
                "cannot book {} because it is in the past",
                self.date
            )));
        }
        Ok(())
    }

    /// Check every requested slot against the venue's current ledger.
    ///
    /// Approval re-checks authoritatively; this only stops requests for
    /// slots that are visibly taken already.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::SlotUnavailable`] for the first slot that
    /// conflicts.
    pub fn ensure_available(&self, ledger: &AvailabilityLedger) -> Result<(), BookingError> {
        self.slots
            .iter()
            .try_for_each(|slot| ledger.check(self.date, slot))
            .map_err(BookingError::SlotUnavailable)
    }

    /// Expand the request into one pending booking per slot.
    #[must_use]
    pub fn into_bookings(
        self,
        requester: &Identity,
        venue: &Venue,
        attachment_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Vec<Booking> {
        let purpose = self.purpose.trim().to_string();
        let mut slots = self.slots;
        slots.sort_unstable();
        slots
            .into_iter()
            .map(|slot| Booking {
                id: BookingId::new(),
                venue_id: venue.id,
                venue_name: venue.name.clone(),
                user_id: requester.user_id.clone(),
                user_email: requester.email.clone(),
                date: self.date,
                slot,
                purpose: purpose.clone(),
                attachment_url: attachment_url.map(str::to_string),
                status: BookingStatus::Pending,
                created_at: now,
                reviewed_at: None,
                reviewed_by: None,
            })
            .collect()
    }
}
