//! Domain types for venues, bookings and the people acting on them.
//!
//! Record field names serialize in camelCase, which is the shape stored in
//! the document store and returned over HTTP.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::error::BookingError;
use crate::ledger::AvailabilityLedger;
use crate::slot::{Slot, SlotParseError, SlotTime};

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a venue.
    VenueId
);

uuid_id!(
    /// Unique identifier for a booking request.
    BookingId
);

/// Opaque user identifier issued by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a provider-issued id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optimistic-concurrency version of a venue document.
///
/// Every successful venue write stores `expected.next()`; a writer holding a
/// stale version is rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Version of a freshly created venue.
    pub const INITIAL: Self = Self(0);

    /// Create a version from a raw counter.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw counter.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The version a successful write produces.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Role string supplied by the identity provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular member: may browse and request bookings.
    User,
    /// Administrator: may review bookings and manage venues.
    Admin,
    /// Administrator who also manages roles (outside this system).
    Superadmin,
}

impl Role {
    /// Whether this role may approve, reject or revoke bookings and manage venues.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::Superadmin)
    }

    /// Lowercase role name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Superadmin => "superadmin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role string that is not one of `user`, `admin`, `superadmin`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "superadmin" => Ok(Self::Superadmin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// The authenticated caller, as asserted by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Provider-issued user id.
    pub user_id: UserId,
    /// Email address, recorded on submitted bookings.
    pub email: String,
    /// Role; trusted as given.
    pub role: Role,
}

impl Identity {
    /// Create an identity.
    #[must_use]
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: UserId::new(user_id),
            email: email.into(),
            role,
        }
    }

    /// Shorthand for `self.role.is_admin()`.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

// ============================================================================
// Venue
// ============================================================================

/// Display status of a venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueStatus {
    /// No upcoming bookings.
    Available,
    /// At least one upcoming booking.
    Booked,
    /// Closed by an administrator.
    Maintenance,
}

impl VenueStatus {
    /// Lowercase status name, as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Booked => "booked",
            Self::Maintenance => "maintenance",
        }
    }

    /// Parse a stored status name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(Self::Available),
            "booked" => Some(Self::Booked),
            "maintenance" => Some(Self::Maintenance),
            _ => None,
        }
    }
}

impl fmt::Display for VenueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bookable venue and its availability ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    /// Venue id.
    pub id: VenueId,
    /// Display name.
    pub name: String,
    /// Seating capacity; always positive.
    pub capacity: u32,
    /// Free-text description.
    pub description: String,
    /// External image reference.
    pub image_url: Option<String>,
    /// Current display status.
    pub status: VenueStatus,
    /// Booked slots by date.
    pub availability: AvailabilityLedger,
    /// Concurrency token.
    pub version: Version,
    /// Time of the last write.
    pub updated_at: DateTime<Utc>,
}

impl Venue {
    /// Start building a venue with an empty ledger.
    #[must_use]
    pub fn builder(name: impl Into<String>, capacity: u32) -> VenueBuilder {
        VenueBuilder {
            id: VenueId::new(),
            name: name.into(),
            capacity,
            description: String::new(),
            image_url: None,
        }
    }
}

/// Builder for [`Venue`].
#[derive(Clone, Debug)]
#[must_use]
pub struct VenueBuilder {
    id: VenueId,
    name: String,
    capacity: u32,
    description: String,
    image_url: Option<String>,
}

impl VenueBuilder {
    /// Use a specific id instead of a random one.
    pub fn id(mut self, id: VenueId) -> Self {
        self.id = id;
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the image reference.
    pub fn image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// Finish: status `available`, empty ledger, initial version.
    pub fn build(self, now: DateTime<Utc>) -> Venue {
        Venue {
            id: self.id,
            name: self.name,
            capacity: self.capacity,
            description: self.description,
            image_url: self.image_url,
            status: VenueStatus::Available,
            availability: AvailabilityLedger::new(),
            version: Version::INITIAL,
            updated_at: now,
        }
    }
}

/// Administrator request to create a venue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVenue {
    /// Display name.
    pub name: String,
    /// Seating capacity.
    pub capacity: u32,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Pre-hosted image reference.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewVenue {
    /// Validate and turn into a venue record.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for a blank name or zero capacity.
    pub fn into_venue(self, now: DateTime<Utc>) -> Result<Venue, BookingError> {
        let name = validate_name(&self.name)?;
        validate_capacity(self.capacity)?;
        let mut builder = Venue::builder(name, self.capacity).description(self.description.trim());
        if let Some(url) = self.image_url.filter(|u| !u.trim().is_empty()) {
            builder = builder.image_url(url);
        }
        Ok(builder.build(now))
    }
}

/// Partial update of a venue's descriptive fields.
///
/// Status and availability are never patched directly: maintenance has its
/// own operation and the ledger only changes through booking reviews.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenuePatch {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New capacity.
    #[serde(default)]
    pub capacity: Option<u32>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New image reference; an empty string clears it.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl VenuePatch {
    /// Apply the patch.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] if the patched name or capacity is
    /// invalid. The venue is left untouched in that case.
    pub fn apply(&self, venue: &mut Venue) -> Result<(), BookingError> {
        let name = self.name.as_deref().map(validate_name).transpose()?;
        if let Some(capacity) = self.capacity {
            validate_capacity(capacity)?;
            venue.capacity = capacity;
        }
        if let Some(name) = name {
            venue.name = name;
        }
        if let Some(description) = &self.description {
            venue.description = description.trim().to_string();
        }
        if let Some(url) = &self.image_url {
            venue.image_url = Some(url.trim().to_string()).filter(|u| !u.is_empty());
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, BookingError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BookingError::Validation("venue name is required".to_string()));
    }
    Ok(name.to_string())
}

fn validate_capacity(capacity: u32) -> Result<(), BookingError> {
    if capacity == 0 {
        return Err(BookingError::Validation(
            "venue capacity must be a positive number".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Booking
// ============================================================================

/// Review status of a booking request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Awaiting review.
    Pending,
    /// Granted; the slot is in the venue ledger.
    Approved,
    /// Declined, auto-rejected or revoked.
    Rejected,
}

impl BookingStatus {
    /// Lowercase status name, as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a stored status name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to use one slot of one venue on one date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BookingRecord", into = "BookingRecord")]
pub struct Booking {
    /// Booking id.
    pub id: BookingId,
    /// Venue the slot belongs to.
    pub venue_id: VenueId,
    /// Venue name at submission time.
    pub venue_name: String,
    /// Requesting user.
    pub user_id: UserId,
    /// Requesting user's email at submission time.
    pub user_email: String,
    /// Requested date.
    pub date: NaiveDate,
    /// Requested slot; its string form is the ledger entry.
    pub slot: Slot,
    /// Why the venue is needed.
    pub purpose: String,
    /// Supporting document, if the upload succeeded.
    pub attachment_url: Option<String>,
    /// Review status.
    pub status: BookingStatus,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Time of the last review.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// User id of the last reviewer.
    pub reviewed_by: Option<String>,
}

impl Booking {
    /// Start time of the slot.
    #[must_use]
    pub const fn start_time(&self) -> SlotTime {
        self.slot.start()
    }

    /// End time of the slot.
    #[must_use]
    pub const fn end_time(&self) -> SlotTime {
        self.slot.end()
    }

    /// The `HH:MM-HH:MM` string stored in the ledger for this booking.
    #[must_use]
    pub fn time_slot(&self) -> String {
        self.slot.to_string()
    }

    /// Record a review decision with its audit fields.
    pub fn mark_reviewed(&mut self, status: BookingStatus, reviewer: &Identity, at: DateTime<Utc>) {
        self.status = status;
        self.reviewed_at = Some(at);
        self.reviewed_by = Some(reviewer.user_id.to_string());
    }
}

/// Stored and wire shape of a [`Booking`].
///
/// `timeSlot` is written for readers but ignored on input; the slot is always
/// rebuilt from `startTime` and `endTime`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookingRecord {
    id: BookingId,
    venue_id: VenueId,
    venue_name: String,
    user_id: UserId,
    user_email: String,
    date: NaiveDate,
    start_time: SlotTime,
    end_time: SlotTime,
    #[serde(default, skip_deserializing)]
    time_slot: String,
    purpose: String,
    #[serde(default)]
    attachment_url: Option<String>,
    status: BookingStatus,
    created_at: DateTime<Utc>,
    #[serde(default)]
    reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    reviewed_by: Option<String>,
}

impl TryFrom<BookingRecord> for Booking {
    type Error = SlotParseError;

    fn try_from(record: BookingRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            venue_id: record.venue_id,
            venue_name: record.venue_name,
            user_id: record.user_id,
            user_email: record.user_email,
            date: record.date,
            slot: Slot::new(record.start_time, record.end_time)?,
            purpose: record.purpose,
            attachment_url: record.attachment_url,
            status: record.status,
            created_at: record.created_at,
            reviewed_at: record.reviewed_at,
            reviewed_by: record.reviewed_by,
        })
    }
}

impl From<Booking> for BookingRecord {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            venue_id: booking.venue_id,
            venue_name: booking.venue_name,
            user_id: booking.user_id,
            user_email: booking.user_email,
            date: booking.date,
            start_time: booking.slot.start(),
            end_time: booking.slot.end(),
            time_slot: booking.slot.to_string(),
            purpose: booking.purpose,
            attachment_url: booking.attachment_url,
            status: booking.status,
            created_at: booking.created_at,
            reviewed_at: booking.reviewed_at,
            reviewed_by: booking.reviewed_by,
        }
    }
}
