//! `PostgreSQL` document store for venue booking.
//!
//! [`PostgresDocumentStore`] implements the
//! [`DocumentStore`](venue_booking_core::store::DocumentStore) port on two
//! tables:
//!
//! - `venues`: one row per venue, the availability ledger held as `JSONB`
//!   and guarded by a `version` column
//! - `bookings`: one row per booking, the slot split into `start_time` and
//!   `end_time`
//!
//! Review commits run in a single transaction so a ledger update and its
//! booking status change land together or not at all. Every write also
//! issues `pg_notify` on [`CHANGE_CHANNEL`]; [`PostgresDocumentStore::start_change_feed`]
//! listens on that channel and republishes the changes to local subscribers,
//! so every process sharing the database sees the same live feed.
//!
//! # Example
//!
//! ```ignore
//! use venue_booking_postgres::PostgresDocumentStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresDocumentStore::connect("postgres://localhost/venues", 10).await?;
//!     store.migrate().await?;
//!     let _feed = store.start_change_feed().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod feed;
mod rows;
mod store;

pub use store::PostgresDocumentStore;

/// `LISTEN`/`NOTIFY` channel carrying JSON-encoded
/// [`StoreChange`](venue_booking_core::store::StoreChange) payloads.
pub const CHANGE_CHANNEL: &str = "venue_booking_changes";
