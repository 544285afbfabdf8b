//! Document store port.
//!
//! The store holds two collections, venues and bookings, keyed by id. Venue
//! writes carry the version the writer read; a mismatch is reported as
//! [`StoreError::ConcurrencyConflict`] and nothing is written.
//!
//! Methods return boxed futures so the trait stays dyn-compatible and can be
//! shared as `Arc<dyn DocumentStore>`.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::types::{Booking, BookingId, BookingStatus, UserId, Venue, VenueId, Version};

/// Storage failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The document to update does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// `"booking"` or `"venue"`.
        entity: &'static str,
        /// Missing id.
        id: String,
    },

    /// Optimistic concurrency check failed.
    #[error("concurrency conflict on venue {venue_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// Contended venue.
        venue_id: VenueId,
        /// Version supplied by the writer.
        expected: Version,
        /// Version currently stored.
        actual: Version,
    },

    /// The booking's status moved since the writer read it.
    #[error("booking {booking_id} changed concurrently: expected status {expected}, found {actual}")]
    StaleBooking {
        /// Contended booking.
        booking_id: BookingId,
        /// Status the writer read.
        expected: BookingStatus,
        /// Status currently stored.
        actual: BookingStatus,
    },

    /// Backend failure.
    #[error("database error: {0}")]
    Database(String),

    /// A stored document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Boxed future returned by every store method.
pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T, StoreError>>;

/// Filter for booking listings. Every populated field must match.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingQuery {
    /// Only bookings in this status.
    #[serde(default)]
    pub status: Option<BookingStatus>,
    /// Only bookings made by this user.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Only bookings for this venue.
    #[serde(default)]
    pub venue_id: Option<VenueId>,
}

impl BookingQuery {
    /// Everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Bookings made by `user_id`.
    #[must_use]
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Restrict to `status`.
    #[must_use]
    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether `booking` passes the filter.
    #[must_use]
    pub fn matches(&self, booking: &Booking) -> bool {
        self.status.is_none_or(|s| s == booking.status)
            && self.user_id.as_ref().is_none_or(|u| *u == booking.user_id)
            && self.venue_id.is_none_or(|v| v == booking.venue_id)
    }
}

/// A venue write guarded by the version the writer read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VenueWrite {
    /// New venue contents.
    pub venue: Venue,
    /// Version the writer based its changes on.
    pub expected_version: Version,
}

/// The writes produced by one booking review, applied all-or-nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewCommit {
    /// Ledger update, if the review touched the venue.
    pub venue: Option<VenueWrite>,
    /// Reviewed booking.
    pub booking: Booking,
    /// Status the booking had when the review read it.
    pub expected_status: BookingStatus,
}

/// Documents as stored by a successful [`ReviewCommit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewCommitted {
    /// Stored venue (with its new version), if one was written.
    pub venue: Option<Venue>,
    /// Stored booking.
    pub booking: Booking,
}

/// Change notification for live listings.
///
/// Subscribers re-read the affected documents; payloads stay small.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreChange {
    /// A venue was created or updated.
    VenueChanged {
        /// Venue id.
        id: VenueId,
        /// Stored version.
        version: Version,
    },
    /// A venue was deleted.
    VenueDeleted {
        /// Venue id.
        id: VenueId,
    },
    /// A booking was created or updated.
    BookingChanged {
        /// Booking id.
        id: BookingId,
        /// Venue the booking belongs to.
        venue_id: VenueId,
        /// Stored status.
        status: BookingStatus,
    },
}

impl StoreChange {
    /// Change event for a stored venue.
    #[must_use]
    pub const fn venue(venue: &Venue) -> Self {
        Self::VenueChanged {
            id: venue.id,
            version: venue.version,
        }
    }

    /// Change event for a stored booking.
    #[must_use]
    pub const fn booking(booking: &Booking) -> Self {
        Self::BookingChanged {
            id: booking.id,
            venue_id: booking.venue_id,
            status: booking.status,
        }
    }
}

/// Document-style persistence for venues and bookings.
///
/// Implementations must give read-after-write consistency per document.
pub trait DocumentStore: Send + Sync {
    /// Cheap connectivity check used by readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend is unreachable.
    fn ping(&self) -> StoreFuture<'_, ()>;

    /// Load one venue.
    ///
    /// # Errors
    ///
    /// Returns a backend or decoding error; a missing venue is `Ok(None)`.
    fn get_venue(&self, id: VenueId) -> StoreFuture<'_, Option<Venue>>;

    /// Load every venue.
    ///
    /// # Errors
    ///
    /// Returns a backend or decoding error.
    fn list_venues(&self) -> StoreFuture<'_, Vec<Venue>>;

    /// Create a venue as given.
    ///
    /// # Errors
    ///
    /// Returns a backend error, including an id collision.
    fn insert_venue(&self, venue: Venue) -> StoreFuture<'_, Venue>;

    /// Replace a venue if its stored version equals `expected`.
    ///
    /// The stored document gets version `expected.next()` and is returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConcurrencyConflict`] on a version mismatch and
    /// [`StoreError::NotFound`] if the venue is gone.
    fn save_venue(&self, venue: Venue, expected: Version) -> StoreFuture<'_, Venue>;

    /// Delete a venue. Bookings referencing it are left alone.
    ///
    /// # Errors
    ///
    /// Returns a backend error. Deleting a missing venue is `Ok(false)`.
    fn delete_venue(&self, id: VenueId) -> StoreFuture<'_, bool>;

    /// Load one booking.
    ///
    /// # Errors
    ///
    /// Returns a backend or decoding error; a missing booking is `Ok(None)`.
    fn get_booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>>;

    /// Bookings matching `query`, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns a backend or decoding error.
    fn list_bookings(&self, query: BookingQuery) -> StoreFuture<'_, Vec<Booking>>;

    /// Create several bookings together.
    ///
    /// # Errors
    ///
    /// Returns a backend error; no booking is created in that case.
    fn insert_bookings(&self, bookings: Vec<Booking>) -> StoreFuture<'_, Vec<Booking>>;

    /// Update the reviewable fields of a booking whose stored status is
    /// still `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StaleBooking`] if the status moved and
    /// [`StoreError::NotFound`] if the booking is gone.
    fn save_booking(&self, booking: Booking, expected: BookingStatus) -> StoreFuture<'_, Booking>;

    /// Apply a review's venue and booking writes atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConcurrencyConflict`] if the venue version moved
    /// and [`StoreError::StaleBooking`] if the booking status moved; neither
    /// document is written on any error.
    fn commit_review(&self, commit: ReviewCommit) -> StoreFuture<'_, ReviewCommitted>;

    /// Live feed of changes to both collections.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}
