//! Errors surfaced by booking operations.

use thiserror::Error;

use crate::conflict::SlotConflict;
use crate::review::ReviewKind;
use crate::slot::SlotParseError;
use crate::store::StoreError;
use crate::types::{BookingId, BookingStatus, VenueId, Version};

/// Failure of a booking or venue operation.
///
/// Conflicts found while *approving* are not errors: they become an
/// auto-rejection outcome. [`BookingError::SlotUnavailable`] is only raised
/// when a request is submitted for a slot that is visibly taken.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Booking or venue missing.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// `"booking"` or `"venue"`.
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// Input rejected before anything was written.
    #[error("{0}")]
    Validation(String),

    /// The caller lacks the required role or ownership.
    #[error("{0}")]
    Forbidden(String),

    /// A requested slot is already taken on the venue.
    #[error("requested slot is unavailable: {0}")]
    SlotUnavailable(SlotConflict),

    /// The booking is not in a state the action applies to.
    #[error("cannot {action} a booking that is {from}")]
    InvalidTransition {
        /// Current booking status.
        from: BookingStatus,
        /// The attempted action.
        action: ReviewKind,
    },

    /// The venue changed between read and write; retry the operation.
    #[error("venue {venue_id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        /// Venue that was contended.
        venue_id: VenueId,
        /// Version the writer read.
        expected: Version,
        /// Version found in the store.
        actual: Version,
    },

    /// The booking was reviewed elsewhere between read and write; retry the
    /// operation.
    #[error("booking {booking_id} was modified concurrently (expected {expected}, found {actual})")]
    StaleBooking {
        /// Booking that was contended.
        booking_id: BookingId,
        /// Status the writer read.
        expected: BookingStatus,
        /// Status found in the store.
        actual: BookingStatus,
    },

    /// A storage read or write failed.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}

impl BookingError {
    /// Shorthand for a missing venue.
    #[must_use]
    pub fn venue_not_found(id: VenueId) -> Self {
        Self::NotFound {
            entity: "venue",
            id: id.to_string(),
        }
    }

    /// Shorthand for a missing booking.
    #[must_use]
    pub fn booking_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "booking",
            id: id.to_string(),
        }
    }

    /// Whether retrying the whole operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::StaleBooking { .. })
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::ConcurrencyConflict {
                venue_id,
                expected,
                actual,
            } => Self::Conflict {
                venue_id,
                expected,
                actual,
            },
            StoreError::StaleBooking {
                booking_id,
                expected,
                actual,
            } => Self::StaleBooking {
                booking_id,
                expected,
                actual,
            },
            StoreError::Database(_) | StoreError::Serialization(_) => {
                Self::PersistenceFailure(err.to_string())
            }
        }
    }
}

impl From<SlotParseError> for BookingError {
    fn from(err: SlotParseError) -> Self {
        Self::Validation(err.to_string())
    }
}
