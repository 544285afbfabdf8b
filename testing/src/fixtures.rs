//! Ready-made identities, venues and bookings.

#![allow(clippy::unwrap_used)] // Fixtures parse literals
#![allow(clippy::missing_panics_doc)]

use chrono::{DateTime, NaiveDate, Utc};
use venue_booking_core::{
    Booking, BookingId, BookingStatus, Identity, Role, Slot, UserId, Venue,
};

/// Creation timestamp used by fixtures: 2025-05-19 12:00:00 UTC.
#[must_use]
pub fn created_at() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-05-19T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Parse `YYYY-MM-DD`.
#[must_use]
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Parse `HH:MM-HH:MM`.
#[must_use]
pub fn slot(s: &str) -> Slot {
    s.parse().unwrap()
}

/// An administrator.
#[must_use]
pub fn admin() -> Identity {
    Identity::new("admin-1", "admin@example.com", Role::Admin)
}

/// A second administrator, for concurrent review tests.
#[must_use]
pub fn superadmin() -> Identity {
    Identity::new("root-1", "root@example.com", Role::Superadmin)
}

/// A regular user identified by `id`.
#[must_use]
pub fn member(id: &str) -> Identity {
    Identity::new(id, format!("{id}@example.com"), Role::User)
}

/// An empty, available venue.
#[must_use]
pub fn venue(name: &str) -> Venue {
    Venue::builder(name, 100)
        .description(format!("{name} for tests"))
        .build(created_at())
}

/// A venue whose ledger already holds `slots` on `day`.
#[must_use]
pub fn booked_venue(name: &str, day: &str, slots: &[&str]) -> Venue {
    let mut venue = venue(name);
    for s in slots {
        venue.availability.add_slot(date(day), &slot(s));
    }
    venue.refresh_availability(date(day));
    venue
}

/// A pending booking by `member("user-1")`.
#[must_use]
pub fn pending_booking(venue: &Venue, day: &str, time_slot: &str) -> Booking {
    booking_by(&member("user-1"), venue, day, time_slot)
}

/// A pending booking by `requester`.
#[must_use]
pub fn booking_by(requester: &Identity, venue: &Venue, day: &str, time_slot: &str) -> Booking {
    Booking {
        id: BookingId::new(),
        venue_id: venue.id,
        venue_name: venue.name.clone(),
        user_id: requester.user_id.clone(),
        user_email: requester.email.clone(),
        date: date(day),
        slot: slot(time_slot),
        purpose: "Team offsite".to_string(),
        attachment_url: None,
        status: BookingStatus::Pending,
        created_at: created_at(),
        reviewed_at: None,
        reviewed_by: None,
    }
}

/// An approved booking. The venue ledger is not touched.
#[must_use]
pub fn approved_booking(venue: &Venue, day: &str, time_slot: &str) -> Booking {
    let mut booking = pending_booking(venue, day, time_slot);
    booking.mark_reviewed(BookingStatus::Approved, &admin(), created_at());
    booking
}

/// User id of [`pending_booking`]'s requester.
#[must_use]
pub fn default_user_id() -> UserId {
    UserId::new("user-1")
}
