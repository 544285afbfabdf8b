//! In-memory document store.
//!
//! Behaves like the PostgreSQL adapter (version checks, all-or-nothing review
//! commits, change feed) and adds switches for injecting failures and
//! simulating writers in other processes.

#![allow(clippy::unwrap_used)] // Poisoned test locks should fail the test

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use chrono::NaiveDate;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;
use venue_booking_core::store::{
    BookingQuery, DocumentStore, ReviewCommit, ReviewCommitted, StoreChange, StoreError,
    StoreFuture,
};
use venue_booking_core::{Booking, BookingId, BookingStatus, Slot, Venue, VenueId, Version};

const CHANGE_FEED_CAPACITY: usize = 256;

/// `HashMap`-backed [`DocumentStore`] for fast, deterministic tests.
///
/// Clones share the same documents.
///
/// # Example
///
/// ```
/// use venue_booking_testing::InMemoryDocumentStore;
/// use venue_booking_core::store::DocumentStore;
/// use venue_booking_core::Venue;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryDocumentStore::new();
/// let venue = store
///     .insert_venue(Venue::builder("Main Hall", 120).build(chrono::Utc::now()))
///     .await?;
/// assert!(store.venue(venue.id).is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryDocumentStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    venues: RwLock<HashMap<VenueId, Venue>>,
    bookings: RwLock<HashMap<BookingId, Booking>>,
    changes: broadcast::Sender<StoreChange>,
    offline: AtomicBool,
    fail_venue_writes: AtomicBool,
    fail_booking_writes: AtomicBool,
    foreign_venue_writes: AtomicUsize,
    foreign_approval: Mutex<Option<(NaiveDate, Slot)>>,
    foreign_review: Mutex<Option<BookingStatus>>,
    venue_writes: AtomicUsize,
    booking_writes: AtomicUsize,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                venues: RwLock::new(HashMap::new()),
                bookings: RwLock::new(HashMap::new()),
                changes,
                offline: AtomicBool::new(false),
                fail_venue_writes: AtomicBool::new(false),
                fail_booking_writes: AtomicBool::new(false),
                foreign_venue_writes: AtomicUsize::new(0),
                foreign_approval: Mutex::new(None),
                foreign_review: Mutex::new(None),
                venue_writes: AtomicUsize::new(0),
                booking_writes: AtomicUsize::new(0),
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Test setup and inspection
    // ------------------------------------------------------------------------

    /// Put `venue` in the store as-is, without a change event or version bump.
    pub fn seed_venue(&self, venue: Venue) {
        self.inner.venues.write().unwrap().insert(venue.id, venue);
    }

    /// Put `booking` in the store as-is, without a change event.
    pub fn seed_booking(&self, booking: Booking) {
        self.inner
            .bookings
            .write()
            .unwrap()
            .insert(booking.id, booking);
    }

    /// Current stored venue.
    #[must_use]
    pub fn venue(&self, id: VenueId) -> Option<Venue> {
        self.inner.venues.read().unwrap().get(&id).cloned()
    }

    /// Current stored booking.
    #[must_use]
    pub fn booking(&self, id: BookingId) -> Option<Booking> {
        self.inner.bookings.read().unwrap().get(&id).cloned()
    }

    /// Number of stored bookings.
    #[must_use]
    pub fn booking_count(&self) -> usize {
        self.inner.bookings.read().unwrap().len()
    }

    /// Make `ping` fail.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Make every venue write fail with a database error.
    pub fn fail_venue_writes(&self, fail: bool) {
        self.inner.fail_venue_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every booking write fail with a database error.
    pub fn fail_booking_writes(&self, fail: bool) {
        self.inner.fail_booking_writes.store(fail, Ordering::SeqCst);
    }

    /// Let another writer bump the venue version just before each of the
    /// next `count` guarded venue writes, so those writes conflict.
    pub fn simulate_foreign_venue_writes(&self, count: usize) {
        self.inner
            .foreign_venue_writes
            .store(count, Ordering::SeqCst);
    }

    /// Let another writer book `slot` on `date` just before the next guarded
    /// venue write, so that write conflicts and the slot is already taken on
    /// any fresh read.
    pub fn simulate_foreign_approval(&self, date: NaiveDate, slot: Slot) {
        *self.inner.foreign_approval.lock().unwrap() = Some((date, slot));
    }

    /// Let another writer move the written booking to `status` just before
    /// the next booking write.
    pub fn simulate_foreign_review(&self, status: BookingStatus) {
        *self.inner.foreign_review.lock().unwrap() = Some(status);
    }

    /// Successful venue writes so far.
    #[must_use]
    pub fn venue_write_count(&self) -> usize {
        self.inner.venue_writes.load(Ordering::SeqCst)
    }

    /// Successful booking writes so far.
    #[must_use]
    pub fn booking_write_count(&self) -> usize {
        self.inner.booking_writes.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------------
    // Write helpers
    // ------------------------------------------------------------------------

    fn publish(&self, change: StoreChange) {
        // No subscribers is fine.
        let _ = self.inner.changes.send(change);
    }

    fn injected(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Database(format!("injected {what} write failure")))
        } else {
            Ok(())
        }
    }

    fn take_foreign_write(&self) -> bool {
        self.inner
            .foreign_venue_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Version-checked venue replacement on already-locked maps.
    fn check_venue(
        &self,
        venues: &mut HashMap<VenueId, Venue>,
        venue: &Venue,
        expected: Version,
    ) -> Result<(), StoreError> {
        Self::injected(&self.inner.fail_venue_writes, "venue")?;
        let stored = venues.get_mut(&venue.id).ok_or_else(|| StoreError::NotFound {
            entity: "venue",
            id: venue.id.to_string(),
        })?;
        if let Some((date, slot)) = self.inner.foreign_approval.lock().unwrap().take() {
            stored.availability.add_slot(date, &slot);
            stored.version = stored.version.next();
        }
        if self.take_foreign_write() {
            stored.version = stored.version.next();
        }
        if stored.version != expected {
            return Err(StoreError::ConcurrencyConflict {
                venue_id: venue.id,
                expected,
                actual: stored.version,
            });
        }
        Ok(())
    }

    /// Status-checked booking replacement on an already-locked map.
    fn check_booking(
        &self,
        bookings: &mut HashMap<BookingId, Booking>,
        booking: &Booking,
        expected: BookingStatus,
    ) -> Result<(), StoreError> {
        Self::injected(&self.inner.fail_booking_writes, "booking")?;
        let stored = bookings.get_mut(&booking.id).ok_or_else(|| StoreError::NotFound {
            entity: "booking",
            id: booking.id.to_string(),
        })?;
        if let Some(status) = self.inner.foreign_review.lock().unwrap().take() {
            stored.status = status;
        }
        if stored.status != expected {
            return Err(StoreError::StaleBooking {
                booking_id: booking.id,
                expected,
                actual: stored.status,
            });
        }
        Ok(())
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        let offline = self.inner.offline.load(Ordering::SeqCst);
        Box::pin(async move {
            if offline {
                Err(StoreError::Database("store is offline".to_string()))
            } else {
                Ok(())
            }
        })
    }

    fn get_venue(&self, id: VenueId) -> StoreFuture<'_, Option<Venue>> {
        let venue = self.venue(id);
        Box::pin(async move { Ok(venue) })
    }

    fn list_venues(&self) -> StoreFuture<'_, Vec<Venue>> {
        let venues: Vec<Venue> = self.inner.venues.read().unwrap().values().cloned().collect();
        Box::pin(async move { Ok(venues) })
    }

    fn insert_venue(&self, venue: Venue) -> StoreFuture<'_, Venue> {
        Box::pin(async move {
            Self::injected(&self.inner.fail_venue_writes, "venue")?;
            {
                let mut venues = self.inner.venues.write().unwrap();
                if venues.contains_key(&venue.id) {
                    return Err(StoreError::Database(format!(
                        "venue {} already exists",
                        venue.id
                    )));
                }
                venues.insert(venue.id, venue.clone());
            }
            self.inner.venue_writes.fetch_add(1, Ordering::SeqCst);
            self.publish(StoreChange::venue(&venue));
            Ok(venue)
        })
    }

    fn save_venue(&self, mut venue: Venue, expected: Version) -> StoreFuture<'_, Venue> {
        Box::pin(async move {
            {
                let mut venues = self.inner.venues.write().unwrap();
                self.check_venue(&mut venues, &venue, expected)?;
                venue.version = expected.next();
                venues.insert(venue.id, venue.clone());
            }
            self.inner.venue_writes.fetch_add(1, Ordering::SeqCst);
            self.publish(StoreChange::venue(&venue));
            Ok(venue)
        })
    }

    fn delete_venue(&self, id: VenueId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            Self::injected(&self.inner.fail_venue_writes, "venue")?;
            let removed = self.inner.venues.write().unwrap().remove(&id).is_some();
            if removed {
                self.publish(StoreChange::VenueDeleted { id });
            }
            Ok(removed)
        })
    }

    fn get_booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        let booking = self.booking(id);
        Box::pin(async move { Ok(booking) })
    }

    fn list_bookings(&self, query: BookingQuery) -> StoreFuture<'_, Vec<Booking>> {
        let bookings: Vec<Booking> = self
            .inner
            .bookings
            .read()
            .unwrap()
            .values()
            .filter(|booking| query.matches(booking))
            .cloned()
            .collect();
        Box::pin(async move { Ok(bookings) })
    }

    fn insert_bookings(&self, bookings: Vec<Booking>) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            Self::injected(&self.inner.fail_booking_writes, "booking")?;
            {
                let mut stored = self.inner.bookings.write().unwrap();
                if let Some(duplicate) = bookings.iter().find(|b| stored.contains_key(&b.id)) {
                    return Err(StoreError::Database(format!(
                        "booking {} already exists",
                        duplicate.id
                    )));
                }
                for booking in &bookings {
                    stored.insert(booking.id, booking.clone());
                }
            }
            self.inner
                .booking_writes
                .fetch_add(bookings.len(), Ordering::SeqCst);
            for booking in &bookings {
                self.publish(StoreChange::booking(booking));
            }
            Ok(bookings)
        })
    }

    fn save_booking(&self, booking: Booking, expected: BookingStatus) -> StoreFuture<'_, Booking> {
        Box::pin(async move {
            {
                let mut bookings = self.inner.bookings.write().unwrap();
                self.check_booking(&mut bookings, &booking, expected)?;
                bookings.insert(booking.id, booking.clone());
            }
            self.inner.booking_writes.fetch_add(1, Ordering::SeqCst);
            self.publish(StoreChange::booking(&booking));
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
            let stored_venue = {
                let mut venues = self.inner.venues.write().unwrap();
                let mut bookings = self.inner.bookings.write().unwrap();

                if let Some(write) = &venue {
                    self.check_venue(&mut venues, &write.venue, write.expected_version)?;
                }
                self.check_booking(&mut bookings, &booking, expected_status)?;

                let stored_venue = venue.map(|write| {
                    let mut stored = write.venue;
                    stored.version = write.expected_version.next();
                    venues.insert(stored.id, stored.clone());
                    stored
                });
                bookings.insert(booking.id, booking.clone());
                stored_venue
            };

            if let Some(venue) = &stored_venue {
                self.inner.venue_writes.fetch_add(1, Ordering::SeqCst);
                self.publish(StoreChange::venue(venue));
            }
            self.inner.booking_writes.fetch_add(1, Ordering::SeqCst);
            self.publish(StoreChange::booking(&booking));

            Ok(ReviewCommitted {
                venue: stored_venue,
                booking,
            })
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.changes.subscribe()
    }
}
