//! [`DocumentStore`] implementation.

use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tokio::sync::broadcast;
use venue_booking_core::store::{
    BookingQuery, DocumentStore, ReviewCommit, ReviewCommitted, StoreChange, StoreError,
    StoreFuture,
};
use venue_booking_core::types::{
    Booking, BookingId, BookingStatus, UserId, Venue, VenueId, Version,
};

use crate::CHANGE_CHANNEL;
use crate::rows::{
    BOOKING_COLUMNS, VENUE_COLUMNS, booking_from_row, capacity_param, status_from_column,
    venue_from_row, version_from_column, version_param,
};

/// Capacity of the local change broadcast.
const CHANGE_BUFFER: usize = 256;

fn database(action: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| StoreError::Database(format!("Failed to {action}: {e}"))
}

/// `PostgreSQL`-backed document store.
///
/// Cloning is cheap; clones share the pool and the change broadcast.
#[derive(Clone, Debug)]
pub struct PostgresDocumentStore {
    pool: PgPool,
    pub(crate) changes: broadcast::Sender<StoreChange>,
}

impl PostgresDocumentStore {
    /// Connect to `database_url` with a pool of at most `max_connections`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection cannot be established.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(database("connect to database"))?;

        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self { pool, changes }
    }

    /// Create or upgrade the `venues` and `bookings` tables.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to run migrations: {e}")))?;

        tracing::info!("Document store migrations applied");
        Ok(())
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn notify(conn: &mut PgConnection, change: &StoreChange) -> Result<(), StoreError> {
        let payload = serde_json::to_string(change)
            .map_err(|e| StoreError::Serialization(format!("Failed to encode change: {e}")))?;

        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANGE_CHANNEL)
            .bind(payload)
            .execute(&mut *conn)
            .await
            .map_err(database("publish change"))?;

        Ok(())
    }

    /// Version-guarded venue update. Stores `expected.next()`.
    async fn update_venue(
        conn: &mut PgConnection,
        venue: Venue,
        expected: Version,
    ) -> Result<Venue, StoreError> {
        let mut stored = venue;
        stored.version = expected.next();

        let result = sqlx::query(
            r"
            UPDATE venues
            SET name = $2, capacity = $3, description = $4, image_url = $5,
                status = $6, availability = $7, version = $8, updated_at = $9
            WHERE id = $1 AND version = $10
            ",
        )
        .bind(stored.id.as_uuid())
        .bind(&stored.name)
        .bind(capacity_param(stored.capacity)?)
        .bind(&stored.description)
        .bind(stored.image_url.as_deref())
        .bind(stored.status.as_str())
        .bind(Json(&stored.availability))
        .bind(version_param(stored.version)?)
        .bind(stored.updated_at)
        .bind(version_param(expected)?)
        .execute(&mut *conn)
        .await
        .map_err(database("update venue"))?;

        if result.rows_affected() == 0 {
            let current: Option<(i64,)> = sqlx::query_as("SELECT version FROM venues WHERE id = $1")
                .bind(stored.id.as_uuid())
                .fetch_optional(&mut *conn)
                .await
                .map_err(database("read venue version"))?;

            return Err(match current {
                None => StoreError::NotFound {
                    entity: "venue",
                    id: stored.id.to_string(),
                },
                Some((actual,)) => {
                    let actual = version_from_column(actual)?;
                    tracing::debug!(
                        venue_id = %stored.id,
                        expected = %expected,
                        actual = %actual,
                        "Venue version moved"
                    );
                    metrics::counter!("document_store_conflicts_total").increment(1);
                    StoreError::ConcurrencyConflict {
                        venue_id: stored.id,
                        expected,
                        actual,
                    }
                }
            });
        }

        Self::notify(conn, &StoreChange::venue(&stored)).await?;
        Ok(stored)
    }

    /// Replace a booking's review fields if its status is still `expected`.
    async fn update_booking(
        conn: &mut PgConnection,
        booking: &Booking,
        expected: BookingStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE bookings
            SET status = $2, reviewed_at = $3, reviewed_by = $4, attachment_url = $5
            WHERE id = $1 AND status = $6
            ",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.status.as_str())
        .bind(booking.reviewed_at)
        .bind(booking.reviewed_by.as_deref())
        .bind(booking.attachment_url.as_deref())
        .bind(expected.as_str())
        .execute(&mut *conn)
        .await
        .map_err(database("update booking"))?;

        if result.rows_affected() == 0 {
            let current: Option<(String,)> =
                sqlx::query_as("SELECT status FROM bookings WHERE id = $1")
                    .bind(booking.id.as_uuid())
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(database("read booking status"))?;

            return Err(match current {
                None => StoreError::NotFound {
                    entity: "booking",
                    id: booking.id.to_string(),
                },
                Some((actual,)) => {
                    let actual = status_from_column(&actual)?;
                    tracing::debug!(
                        booking_id = %booking.id,
                        expected = %expected,
                        actual = %actual,
                        "Booking status moved"
                    );
                    metrics::counter!("document_store_conflicts_total").increment(1);
                    StoreError::StaleBooking {
                        booking_id: booking.id,
                        expected,
                        actual,
                    }
                }
            });
        }

        Self::notify(conn, &StoreChange::booking(booking)).await
    }

    async fn insert_booking(conn: &mut PgConnection, booking: &Booking) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        );

        sqlx::query(&sql)
            .bind(booking.id.as_uuid())
            .bind(booking.venue_id.as_uuid())
            .bind(&booking.venue_name)
            .bind(booking.user_id.as_str())
            .bind(&booking.user_email)
            .bind(booking.date)
            .bind(booking.slot.start().to_string())
            .bind(booking.slot.end().to_string())
            .bind(&booking.purpose)
            .bind(booking.attachment_url.as_deref())
            .bind(booking.status.as_str())
            .bind(booking.created_at)
            .bind(booking.reviewed_at)
            .bind(booking.reviewed_by.as_deref())
            .execute(&mut *conn)
            .await
            .map_err(database("insert booking"))?;

        Self::notify(conn, &StoreChange::booking(booking)).await
    }
}

impl DocumentStore for PostgresDocumentStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(database("reach database"))?;
            Ok(())
        })
    }

    fn get_venue(&self, id: VenueId) -> StoreFuture<'_, Option<Venue>> {
        Box::pin(async move {
            let sql = format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = $1");
            let row = sqlx::query(&sql)
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(database("load venue"))?;

            row.as_ref().map(venue_from_row).transpose()
        })
    }

    fn list_venues(&self) -> StoreFuture<'_, Vec<Venue>> {
        Box::pin(async move {
            let sql = format!("SELECT {VENUE_COLUMNS} FROM venues ORDER BY name, id");
            let rows = sqlx::query(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(database("list venues"))?;

            rows.iter().map(venue_from_row).collect()
        })
    }

    fn insert_venue(&self, venue: Venue) -> StoreFuture<'_, Venue> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(database("begin transaction"))?;

            let sql = format!(
                "INSERT INTO venues ({VENUE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
            );
            sqlx::query(&sql)
                .bind(venue.id.as_uuid())
                .bind(&venue.name)
                .bind(capacity_param(venue.capacity)?)
                .bind(&venue.description)
                .bind(venue.image_url.as_deref())
                .bind(venue.status.as_str())
                .bind(Json(&venue.availability))
                .bind(version_param(venue.version)?)
                .bind(venue.updated_at)
                .execute(&mut *tx)
                .await
                .map_err(database("insert venue"))?;

            Self::notify(&mut tx, &StoreChange::venue(&venue)).await?;
            tx.commit().await.map_err(database("commit venue"))?;

            tracing::debug!(venue_id = %venue.id, "Venue inserted");
            Ok(venue)
        })
    }

    fn save_venue(&self, venue: Venue, expected: Version) -> StoreFuture<'_, Venue> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(database("begin transaction"))?;
            let stored = Self::update_venue(&mut tx, venue, expected).await?;
            tx.commit().await.map_err(database("commit venue"))?;
            Ok(stored)
        })
    }

    fn delete_venue(&self, id: VenueId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(database("begin transaction"))?;

            let result = sqlx::query("DELETE FROM venues WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(database("delete venue"))?;

            let deleted = result.rows_affected() > 0;
            if deleted {
                Self::notify(&mut tx, &StoreChange::VenueDeleted { id }).await?;
            }
            tx.commit().await.map_err(database("commit venue deletion"))?;

            Ok(deleted)
        })
    }

    fn get_booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
            let row = sqlx::query(&sql)
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(database("load booking"))?;

            row.as_ref().map(booking_from_row).transpose()
        })
    }

    fn list_bookings(&self, query: BookingQuery) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings \
                 WHERE ($1::text IS NULL OR status = $1) \
                   AND ($2::text IS NULL OR user_id = $2) \
                   AND ($3::uuid IS NULL OR venue_id = $3) \
                 ORDER BY created_at DESC, id"
            );
            let rows = sqlx::query(&sql)
                .bind(query.status.map(BookingStatus::as_str))
                .bind(query.user_id.as_ref().map(UserId::as_str))
                .bind(query.venue_id.map(|venue| *venue.as_uuid()))
                .fetch_all(&self.pool)
                .await
                .map_err(database("list bookings"))?;

            rows.iter().map(booking_from_row).collect()
        })
    }

    fn insert_bookings(&self, bookings: Vec<Booking>) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(database("begin transaction"))?;
            for booking in &bookings {
                Self::insert_booking(&mut tx, booking).await?;
            }
            tx.commit().await.map_err(database("commit bookings"))?;

            tracing::debug!(count = bookings.len(), "Bookings inserted");
            Ok(bookings)
        })
    }

    fn save_booking(&self, booking: Booking, expected: BookingStatus) -> StoreFuture<'_, Booking> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(database("begin transaction"))?;
            Self::update_booking(&mut tx, &booking, expected).await?;
            tx.commit().await.map_err(database("commit booking"))?;
            Ok(booking)
        })
    }

    fn commit_review(&self, commit: ReviewCommit) -> StoreFuture<'_, ReviewCommitted> {
        Box::pin(async move {
            let ReviewCommit {
                venue,
                booking,
                expected_status,
            } = commit;
            let mut tx = self.pool.begin().await.map_err(database("begin transaction"))?;

            // Venue first: a version conflict aborts before the booking row is locked.
            let venue = match venue {
                Some(write) => {
                    Some(Self::update_venue(&mut tx, write.venue, write.expected_version).await?)
                }
                None => None,
            };
            Self::update_booking(&mut tx, &booking, expected_status).await?;

            tx.commit().await.map_err(database("commit review"))?;

            tracing::debug!(
                booking_id = %booking.id,
                status = %booking.status,
                venue_written = venue.is_some(),
                "Review committed"
            );
            Ok(ReviewCommitted { venue, booking })
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
