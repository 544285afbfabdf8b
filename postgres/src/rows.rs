//! Row decoding and parameter conversion.

use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Postgres, Row};
use uuid::Uuid;
use venue_booking_core::ledger::AvailabilityLedger;
use venue_booking_core::slot::{Slot, SlotTime};
use venue_booking_core::store::StoreError;
use venue_booking_core::types::{
    Booking, BookingId, BookingStatus, UserId, Venue, VenueId, VenueStatus, Version,
};

pub(crate) const VENUE_COLUMNS: &str =
    "id, name, capacity, description, image_url, status, availability, version, updated_at";

pub(crate) const BOOKING_COLUMNS: &str = "id, venue_id, venue_name, user_id, user_email, date, \
     start_time, end_time, purpose, attachment_url, status, created_at, reviewed_at, reviewed_by";

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Serialization(format!("Failed to decode {name}: {e}")))
}

fn slot_time(row: &PgRow, name: &str) -> Result<SlotTime, StoreError> {
    let raw: String = column(row, name)?;
    raw.parse()
        .map_err(|e| StoreError::Serialization(format!("Invalid {name} {raw:?}: {e}")))
}

pub(crate) fn venue_from_row(row: &PgRow) -> Result<Venue, StoreError> {
    let status: String = column(row, "status")?;
    let status = VenueStatus::parse(&status)
        .ok_or_else(|| StoreError::Serialization(format!("Invalid venue status: {status}")))?;
    let capacity: i32 = column(row, "capacity")?;
    let version: i64 = column(row, "version")?;
    let Json(availability): Json<AvailabilityLedger> = column(row, "availability")?;

    Ok(Venue {
        id: VenueId::from_uuid(column::<Uuid>(row, "id")?),
        name: column(row, "name")?,
        capacity: u32::try_from(capacity)
            .map_err(|_| StoreError::Serialization(format!("Invalid capacity: {capacity}")))?,
        description: column(row, "description")?,
        image_url: column(row, "image_url")?,
        status,
        availability,
        version: version_from_column(version)?,
        updated_at: column(row, "updated_at")?,
    })
}

pub(crate) fn status_from_column(status: &str) -> Result<BookingStatus, StoreError> {
    BookingStatus::parse(status)
        .ok_or_else(|| StoreError::Serialization(format!("Invalid booking status: {status}")))
}

pub(crate) fn booking_from_row(row: &PgRow) -> Result<Booking, StoreError> {
    let status = status_from_column(&column::<String>(row, "status")?)?;
    let slot = Slot::new(slot_time(row, "start_time")?, slot_time(row, "end_time")?)
        .map_err(|e| StoreError::Serialization(format!("Invalid booking slot: {e}")))?;

    Ok(Booking {
        id: BookingId::from_uuid(column::<Uuid>(row, "id")?),
        venue_id: VenueId::from_uuid(column::<Uuid>(row, "venue_id")?),
        venue_name: column(row, "venue_name")?,
        user_id: UserId::new(column::<String>(row, "user_id")?),
        user_email: column(row, "user_email")?,
        date: column(row, "date")?,
        slot,
        purpose: column(row, "purpose")?,
        attachment_url: column(row, "attachment_url")?,
        status,
        created_at: column(row, "created_at")?,
        reviewed_at: column(row, "reviewed_at")?,
        reviewed_by: column(row, "reviewed_by")?,
    })
}

pub(crate) fn version_from_column(value: i64) -> Result<Version, StoreError> {
    u64::try_from(value)
        .map(Version::new)
        .map_err(|_| StoreError::Serialization(format!("Invalid venue version: {value}")))
}

pub(crate) fn version_param(version: Version) -> Result<i64, StoreError> {
    i64::try_from(version.value())
        .map_err(|_| StoreError::Serialization(format!("Venue version out of range: {version}")))
}

pub(crate) fn capacity_param(capacity: u32) -> Result<i32, StoreError> {
    i32::try_from(capacity)
        .map_err(|_| StoreError::Serialization(format!("Capacity out of range: {capacity}")))
}
