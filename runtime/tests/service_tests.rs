//! Booking service tests over the in-memory document store.

#![allow(clippy::unwrap_used)]
#![allow(clippy::too_many_lines)]

use std::sync::Arc;
use std::time::Duration;
use venue_booking_core::environment::{Attachment, AttachmentError, AttachmentHost};
use venue_booking_core::review::ReviewOutcome;
use venue_booking_core::store::{BookingQuery, StoreChange};
use venue_booking_core::submission::{SUBMITTED_MESSAGE, SubmitBooking};
use venue_booking_core::types::{NewVenue, VenuePatch};
use venue_booking_core::{
    Booking, BookingError, BookingStatus, Slot, SlotConflict, Venue, VenueStatus, Version,
};
use venue_booking_runtime::service::ATTACHMENT_SKIPPED_MESSAGE;
use venue_booking_runtime::{
    BookingEnvironment, BookingService, ConsistencyMode, DEGRADED_MESSAGE, RetryPolicy,
    ServiceSettings, VenueQuery,
};
use venue_booking_testing::properties::slot_strategy;
use venue_booking_testing::{
    FixedClock, InMemoryDocumentStore, RecordingNotifier, StubAttachmentHost, fixtures,
    test_clock,
};

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    store: InMemoryDocumentStore,
    clock: FixedClock,
    notifier: Arc<RecordingNotifier>,
    service: BookingService,
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::default()
        .with_initial_delay(Duration::from_millis(1))
        .without_jitter()
}

fn harness_with(consistency: ConsistencyMode, attachments: Arc<dyn AttachmentHost>) -> Harness {
    venue_booking_testing::init_tracing();
    let store = InMemoryDocumentStore::new();
    let clock = test_clock();
    let notifier = Arc::new(RecordingNotifier::new());
    let env = BookingEnvironment::new(Arc::new(store.clone()))
        .with_clock(Arc::new(clock.clone()))
        .with_notifier(notifier.clone())
        .with_attachments(attachments);
    let settings = ServiceSettings {
        consistency,
        retry: fast_retry(),
        ..ServiceSettings::default()
    };
    Harness {
        store,
        clock,
        notifier,
        service: BookingService::with_settings(env, settings),
    }
}

fn harness() -> Harness {
    harness_with(
        ConsistencyMode::Atomic,
        Arc::new(StubAttachmentHost::succeeding("https://files.example")),
    )
}

impl Harness {
    fn venue(&self, name: &str) -> Venue {
        let venue = fixtures::venue(name);
        self.store.seed_venue(venue.clone());
        venue
    }

    fn pending(&self, venue: &Venue, day: &str, slot: &str) -> Booking {
        let booking = fixtures::pending_booking(venue, day, slot);
        self.store.seed_booking(booking.clone());
        booking
    }
}

fn request(venue: &Venue, day: &str, slots: &[&str]) -> SubmitBooking {
    SubmitBooking {
        venue_id: venue.id,
        date: fixtures::date(day),
        slots: slots.iter().map(|s| fixtures::slot(s)).collect(),
        purpose: "Department seminar".to_string(),
        attachment: None,
    }
}

fn pdf() -> Attachment {
    Attachment {
        file_name: "agenda.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.7".to_vec(),
    }
}

// ============================================================================
// End-to-end scenario
// ============================================================================

#[tokio::test]
async fn approve_duplicate_then_revoke() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let first_user = fixtures::member("user-1");
    let second_user = fixtures::member("user-2");

    let first = h
        .service
        .submit(&first_user, request(&venue, "2025-06-01", &["09:00-12:00"]))
        .await
        .unwrap();
    let second = h
        .service
        .submit(&second_user, request(&venue, "2025-06-01", &["09:00-12:00"]))
        .await
        .unwrap();

    let approved = h.service.approve(&fixtures::admin(), first[0].id).await.unwrap();
    assert_eq!(approved.outcome, ReviewOutcome::Approved);
    let stored = h.store.venue(venue.id).unwrap();
    assert_eq!(
        stored.availability.slots_on(fixtures::date("2025-06-01")),
        ["09:00-12:00"]
    );
    assert_eq!(stored.status, VenueStatus::Booked);

    let duplicate = h.service.approve(&fixtures::admin(), second[0].id).await.unwrap();
    assert!(matches!(
        duplicate.outcome,
        ReviewOutcome::AutoRejected {
            conflict: SlotConflict::DuplicateSlot { .. }
        }
    ));
    let rejected = h.store.booking(second[0].id).unwrap();
    assert_eq!(rejected.status, BookingStatus::Rejected);
    assert_eq!(rejected.reviewed_by.as_deref(), Some("admin-1"));
    assert_eq!(rejected.reviewed_at, Some(h.clock_now()));

    let revoked = h.service.revoke(&fixtures::admin(), first[0].id).await.unwrap();
    assert_eq!(revoked.outcome, ReviewOutcome::Revoked);
    let stored = h.store.venue(venue.id).unwrap();
    assert!(stored.availability.is_empty());
    assert_eq!(stored.status, VenueStatus::Available);
    assert_eq!(
        h.store.booking(first[0].id).unwrap().status,
        BookingStatus::Rejected
    );
}

impl Harness {
    fn clock_now(&self) -> chrono::DateTime<chrono::Utc> {
        use venue_booking_core::environment::Clock;
        self.clock.now()
    }
}

// ============================================================================
// Submission
// ============================================================================

#[tokio::test]
async fn submission_creates_one_pending_booking_per_slot() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let user = fixtures::member("user-1");

    let bookings = h
        .service
        .submit(&user, request(&venue, "2025-06-01", &["14:00-16:00", "09:00-12:00"]))
        .await
        .unwrap();

    assert_eq!(bookings.len(), 2);
    assert!(bookings.iter().all(|b| b.status == BookingStatus::Pending));
    assert_eq!(h.store.booking_count(), 2);
    assert!(h.notifier.saw(SUBMITTED_MESSAGE));
    assert_eq!(h.notifier.announcements(), [SUBMITTED_MESSAGE]);
}

#[tokio::test]
async fn submission_validates_before_writing() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let user = fixtures::member("user-1");

    let past = h
        .service
        .submit(&user, request(&venue, "2025-05-19", &["09:00-12:00"]))
        .await;
    assert!(matches!(past, Err(BookingError::Validation(_))));

    let mut blank = request(&venue, "2025-06-01", &["09:00-12:00"]);
    blank.purpose = "  ".to_string();
    assert!(matches!(
        h.service.submit(&user, blank).await,
        Err(BookingError::Validation(_))
    ));

    let unknown = request(&fixtures::venue("Elsewhere"), "2025-06-01", &["09:00-12:00"]);
    assert!(matches!(
        h.service.submit(&user, unknown).await,
        Err(BookingError::NotFound { entity: "venue", .. })
    ));
    assert_eq!(h.store.booking_count(), 0);
}

#[tokio::test]
async fn submission_refuses_visibly_taken_slots() {
    let h = harness();
    let venue = fixtures::booked_venue("Main Hall", "2025-06-01", &["09:00-12:00"]);
    h.store.seed_venue(venue.clone());

    let result = h
        .service
        .submit(
            &fixtures::member("user-1"),
            request(&venue, "2025-06-01", &["11:00-13:00"]),
        )
        .await;

    assert!(matches!(
        result,
        Err(BookingError::SlotUnavailable(SlotConflict::Overlap { .. }))
    ));
}

#[tokio::test]
async fn attachment_url_is_shared_by_all_bookings() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let mut req = request(&venue, "2025-06-01", &["09:00-12:00", "12:00-13:00"]);
    req.attachment = Some(pdf());

    let bookings = h
        .service
        .submit(&fixtures::member("user-1"), req)
        .await
        .unwrap();

    for booking in &bookings {
        assert_eq!(
            booking.attachment_url.as_deref(),
            Some("https://files.example/agenda.pdf")
        );
    }
}

#[tokio::test]
async fn failed_upload_degrades_to_no_attachment() {
    let host = Arc::new(StubAttachmentHost::failing(AttachmentError::Transport(
        "timeout".to_string(),
    )));
    let h = harness_with(ConsistencyMode::Atomic, host.clone());
    let venue = h.venue("Main Hall");
    let mut req = request(&venue, "2025-06-01", &["09:00-12:00"]);
    req.attachment = Some(pdf());

    let bookings = h
        .service
        .submit(&fixtures::member("user-1"), req)
        .await
        .unwrap();

    assert_eq!(host.upload_count(), 1);
    assert_eq!(bookings[0].attachment_url, None);
    assert!(h.notifier.saw(ATTACHMENT_SKIPPED_MESSAGE));
    assert!(h.notifier.saw(SUBMITTED_MESSAGE));
}

// ============================================================================
// Review rules
// ============================================================================

#[tokio::test]
async fn only_administrators_review() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let booking = h.pending(&venue, "2025-06-01", "09:00-12:00");

    let result = h
        .service
        .approve(&fixtures::member("user-1"), booking.id)
        .await;

    assert!(matches!(result, Err(BookingError::Forbidden(_))));
    assert_eq!(h.store.booking(booking.id).unwrap(), booking);
    assert_eq!(h.store.booking_write_count(), 0);
}

#[tokio::test]
async fn revoking_a_pending_booking_is_invalid() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let booking = h.pending(&venue, "2025-06-01", "09:00-12:00");

    let result = h.service.revoke(&fixtures::admin(), booking.id).await;

    assert!(matches!(
        result,
        Err(BookingError::InvalidTransition {
            from: BookingStatus::Pending,
            ..
        })
    ));
}

#[tokio::test]
async fn unknown_booking_is_not_found() {
    let h = harness();
    let result = h
        .service
        .approve(&fixtures::admin(), venue_booking_core::BookingId::new())
        .await;
    assert!(matches!(
        result,
        Err(BookingError::NotFound {
            entity: "booking",
            ..
        })
    ));
}

#[tokio::test]
async fn deleted_venue_blocks_approval_but_not_rejection() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let first = h.pending(&venue, "2025-06-01", "09:00-12:00");
    let second = h.pending(&venue, "2025-06-01", "14:00-16:00");
    h.service
        .delete_venue(&fixtures::admin(), venue.id)
        .await
        .unwrap();

    let approval = h.service.approve(&fixtures::admin(), first.id).await;
    assert!(matches!(
        approval,
        Err(BookingError::NotFound { entity: "venue", .. })
    ));

    let rejection = h.service.reject(&fixtures::admin(), second.id).await.unwrap();
    assert_eq!(rejection.outcome, ReviewOutcome::Rejected);
    assert_eq!(rejection.venue, None);
}

#[tokio::test]
async fn auto_rejection_persists_pruned_ledger() {
    let h = harness();
    let mut venue = fixtures::venue("Main Hall");
    venue
        .availability
        .add_slot(fixtures::date("2025-05-01"), &fixtures::slot("09:00-12:00"));
    venue
        .availability
        .add_slot(fixtures::date("2025-06-01"), &fixtures::slot("09:00-12:00"));
    venue.status = VenueStatus::Booked;
    h.store.seed_venue(venue.clone());
    let booking = h.pending(&venue, "2025-06-01", "10:00-11:00");

    let report = h.service.approve(&fixtures::admin(), booking.id).await.unwrap();

    assert!(matches!(report.outcome, ReviewOutcome::AutoRejected { .. }));
    let stored = h.store.venue(venue.id).unwrap();
    assert_eq!(stored.availability.dates().collect::<Vec<_>>(), ["2025-06-01"]);
    assert_eq!(stored.version, Version::INITIAL.next());
}

#[tokio::test]
async fn maintenance_survives_reviews_and_clears_to_derived_status() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let booking = h.pending(&venue, "2025-06-01", "09:00-12:00");
    let admin = fixtures::admin();

    let maintained = h
        .service
        .set_maintenance(&admin, venue.id, true)
        .await
        .unwrap();
    assert_eq!(maintained.status, VenueStatus::Maintenance);

    h.service.approve(&admin, booking.id).await.unwrap();
    assert_eq!(
        h.store.venue(venue.id).unwrap().status,
        VenueStatus::Maintenance
    );

    let cleared = h
        .service
        .set_maintenance(&admin, venue.id, false)
        .await
        .unwrap();
    assert_eq!(cleared.status, VenueStatus::Booked);
}

// ============================================================================
// Concurrency and consistency modes
// ============================================================================

#[tokio::test]
async fn concurrent_overlapping_approvals_grant_one_slot() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let a = h.pending(&venue, "2025-06-01", "09:00-12:00");
    let b = h.pending(&venue, "2025-06-01", "11:00-13:00");

    let admin = fixtures::admin();
    let superadmin = fixtures::superadmin();
    let (ra, rb) = tokio::join!(
        h.service.approve(&admin, a.id),
        h.service.approve(&superadmin, b.id)
    );
    let outcomes = [ra.unwrap().outcome, rb.unwrap().outcome];

    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == ReviewOutcome::Approved)
            .count(),
        1
    );
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, ReviewOutcome::AutoRejected { .. }))
            .count(),
        1
    );
    assert_eq!(h.store.venue(venue.id).unwrap().availability.slot_count(), 1);
}

#[tokio::test]
async fn version_conflicts_are_replayed() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let booking = h.pending(&venue, "2025-06-01", "09:00-12:00");
    h.store.simulate_foreign_venue_writes(2);

    let report = h.service.approve(&fixtures::admin(), booking.id).await.unwrap();

    assert_eq!(report.outcome, ReviewOutcome::Approved);
    assert_eq!(report.venue.unwrap().version, Version::new(3));
}

#[tokio::test]
async fn persistent_conflicts_surface_and_write_nothing() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let booking = h.pending(&venue, "2025-06-01", "09:00-12:00");
    h.store.simulate_foreign_venue_writes(10);

    let result = h.service.approve(&fixtures::admin(), booking.id).await;

    assert!(matches!(result, Err(BookingError::Conflict { .. })));
    assert_eq!(
        h.store.booking(booking.id).unwrap().status,
        BookingStatus::Pending
    );
}

#[tokio::test]
async fn atomic_mode_fails_the_whole_review_on_venue_write_failure() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let booking = h.pending(&venue, "2025-06-01", "09:00-12:00");
    h.store.fail_venue_writes(true);

    let result = h.service.approve(&fixtures::admin(), booking.id).await;

    assert!(matches!(result, Err(BookingError::PersistenceFailure(_))));
    assert_eq!(
        h.store.booking(booking.id).unwrap().status,
        BookingStatus::Pending
    );
    assert!(h.store.venue(venue.id).unwrap().availability.is_empty());
}

#[tokio::test]
async fn lenient_mode_reports_degraded_success() {
    let h = harness_with(
        ConsistencyMode::Lenient,
        Arc::new(StubAttachmentHost::succeeding("https://files.example")),
    );
    let venue = h.venue("Main Hall");
    let booking = h.pending(&venue, "2025-06-01", "09:00-12:00");
    h.store.fail_venue_writes(true);

    let report = h.service.approve(&fixtures::admin(), booking.id).await.unwrap();

    assert!(report.degraded);
    assert_eq!(report.outcome, ReviewOutcome::Approved);
    assert_eq!(
        h.store.booking(booking.id).unwrap().status,
        BookingStatus::Approved
    );
    assert!(h.store.venue(venue.id).unwrap().availability.is_empty());
    assert!(h.notifier.saw(DEGRADED_MESSAGE));
}

#[tokio::test]
async fn lenient_mode_without_failures_is_not_degraded() {
    let h = harness_with(
        ConsistencyMode::Lenient,
        Arc::new(StubAttachmentHost::succeeding("https://files.example")),
    );
    let venue = h.venue("Main Hall");
    let booking = h.pending(&venue, "2025-06-01", "09:00-12:00");

    let report = h.service.approve(&fixtures::admin(), booking.id).await.unwrap();

    assert!(!report.degraded);
    assert_eq!(report.venue.unwrap().status, VenueStatus::Booked);
    assert!(!h.notifier.saw(DEGRADED_MESSAGE));
}

#[tokio::test]
async fn lenient_venue_conflict_replays_the_slot_instead_of_degrading() {
    let h = harness_with(
        ConsistencyMode::Lenient,
        Arc::new(StubAttachmentHost::succeeding("https://files.example")),
    );
    let venue = h.venue("Main Hall");
    let first = h.pending(&venue, "2025-06-01", "09:00-12:00");
    let second = h.pending(&venue, "2025-06-01", "09:00-12:00");
    h.store.simulate_foreign_venue_writes(1);

    let r1 = h.service.approve(&fixtures::admin(), first.id).await.unwrap();
    let r2 = h.service.approve(&fixtures::admin(), second.id).await.unwrap();

    assert_eq!(r1.outcome, ReviewOutcome::Approved);
    assert!(!r1.degraded);
    assert!(matches!(
        r2.outcome,
        ReviewOutcome::AutoRejected {
            conflict: SlotConflict::DuplicateSlot { .. }
        }
    ));
    assert_eq!(h.store.booking(first.id).unwrap().status, BookingStatus::Approved);
    assert_eq!(h.store.booking(second.id).unwrap().status, BookingStatus::Rejected);
    let stored = h.store.venue(venue.id).unwrap();
    assert_eq!(stored.availability.slots_on(fixtures::date("2025-06-01")), ["09:00-12:00"]);
    assert!(!h.notifier.saw(DEGRADED_MESSAGE));
}

#[tokio::test]
async fn lenient_replay_rejects_when_the_slot_was_taken_meanwhile() {
    let h = harness_with(
        ConsistencyMode::Lenient,
        Arc::new(StubAttachmentHost::succeeding("https://files.example")),
    );
    let venue = h.venue("Main Hall");
    let booking = h.pending(&venue, "2025-06-01", "09:00-12:00");
    h.store
        .simulate_foreign_approval(fixtures::date("2025-06-01"), fixtures::slot("10:00-11:00"));

    let report = h.service.approve(&fixtures::admin(), booking.id).await.unwrap();

    assert!(matches!(
        report.outcome,
        ReviewOutcome::AutoRejected {
            conflict: SlotConflict::Overlap { .. }
        }
    ));
    assert!(!report.degraded);
    assert_eq!(report.booking.status, BookingStatus::Rejected);
    assert_eq!(h.store.booking(booking.id).unwrap().status, BookingStatus::Rejected);
    let stored = h.store.venue(venue.id).unwrap();
    assert_eq!(stored.availability.slots_on(fixtures::date("2025-06-01")), ["10:00-11:00"]);
    assert!(h.notifier.saw("Time slot overlaps with existing booking for Jun 01, 2025."));
    assert!(!h.notifier.saw("Booking for Main Hall approved!"));
}

#[tokio::test]
async fn approval_racing_a_foreign_rejection_is_refused() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let booking = h.pending(&venue, "2025-06-01", "09:00-12:00");
    h.store.simulate_foreign_review(BookingStatus::Rejected);

    let result = h.service.approve(&fixtures::admin(), booking.id).await;

    assert!(matches!(
        result,
        Err(BookingError::InvalidTransition {
            from: BookingStatus::Rejected,
            ..
        })
    ));
    assert_eq!(h.store.booking(booking.id).unwrap().status, BookingStatus::Rejected);
    assert!(h.store.venue(venue.id).unwrap().availability.is_empty());
}

#[tokio::test]
async fn lenient_rejection_racing_a_foreign_approval_is_replayed_as_revocation() {
    let h = harness_with(
        ConsistencyMode::Lenient,
        Arc::new(StubAttachmentHost::succeeding("https://files.example")),
    );
    let venue = h.venue("Main Hall");
    let booking = h.pending(&venue, "2025-06-01", "09:00-12:00");
    h.store.simulate_foreign_review(BookingStatus::Approved);

    let report = h.service.reject(&fixtures::admin(), booking.id).await.unwrap();

    assert_eq!(report.outcome, ReviewOutcome::Revoked);
    assert!(!report.degraded);
    assert_eq!(h.store.booking(booking.id).unwrap().status, BookingStatus::Rejected);
}

// ============================================================================
// Venue reads and administration
// ============================================================================

#[tokio::test]
async fn reads_prune_and_write_through() {
    let h = harness();
    let venue = fixtures::booked_venue("Main Hall", "2025-05-01", &["09:00-12:00"]);
    h.store.seed_venue(venue.clone());

    let read = h.service.get_venue(venue.id).await.unwrap();

    assert!(read.availability.is_empty());
    assert_eq!(read.status, VenueStatus::Available);
    assert_eq!(h.store.venue(venue.id).unwrap().version, Version::new(1));
    assert_eq!(h.store.venue_write_count(), 1);

    h.service.get_venue(venue.id).await.unwrap();
    assert_eq!(h.store.venue_write_count(), 1);
}

#[tokio::test]
async fn failed_write_through_still_returns_pruned_view() {
    let h = harness();
    let venue = fixtures::booked_venue("Main Hall", "2025-05-01", &["09:00-12:00"]);
    h.store.seed_venue(venue.clone());
    h.store.fail_venue_writes(true);

    let read = h.service.get_venue(venue.id).await.unwrap();

    assert!(read.availability.is_empty());
    assert_eq!(h.store.venue(venue.id).unwrap(), venue);
}

#[tokio::test]
async fn listing_filters_by_name_and_prunes() {
    let h = harness();
    h.venue("Garden Terrace");
    let stale = fixtures::booked_venue("Grand Ballroom", "2025-05-01", &["09:00-12:00"]);
    h.store.seed_venue(stale);
    h.venue("Lecture Theatre");

    let all = h.service.list_venues(&VenueQuery::default()).await.unwrap();
    let names: Vec<_> = all.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["Garden Terrace", "Grand Ballroom", "Lecture Theatre"]);
    assert!(all.iter().all(|v| v.status == VenueStatus::Available));

    let filtered = h
        .service
        .list_venues(&VenueQuery {
            name_contains: Some("GRAND".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
}

#[tokio::test]
async fn refresh_counts_rewritten_venues() {
    let h = harness();
    h.venue("Fresh");
    h.store.seed_venue(fixtures::booked_venue("Stale A", "2025-05-01", &["09:00-12:00"]));
    h.store.seed_venue(fixtures::booked_venue("Stale B", "2025-05-10", &["12:00-13:00"]));

    assert!(matches!(
        h.service.refresh_all_venues(&fixtures::member("user-1")).await,
        Err(BookingError::Forbidden(_))
    ));
    assert_eq!(h.service.refresh_all_venues(&fixtures::admin()).await.unwrap(), 2);
    assert_eq!(h.service.refresh_all_venues(&fixtures::admin()).await.unwrap(), 0);
}

#[tokio::test]
async fn day_rollover_expires_yesterdays_slots() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let booking = h.pending(&venue, "2025-05-20", "09:00-12:00");
    h.service.approve(&fixtures::admin(), booking.id).await.unwrap();
    assert_eq!(
        h.service.get_venue(venue.id).await.unwrap().status,
        VenueStatus::Booked
    );

    h.clock.advance(chrono::Duration::days(1));

    let read = h.service.get_venue(venue.id).await.unwrap();
    assert!(read.availability.is_empty());
    assert_eq!(read.status, VenueStatus::Available);
}

#[tokio::test]
async fn free_slots_exclude_taken_catalog_entries() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let booking = h.pending(&venue, "2025-06-01", "09:00-12:00");
    h.service.approve(&fixtures::admin(), booking.id).await.unwrap();

    let free = h
        .service
        .free_slots(venue.id, fixtures::date("2025-06-01"))
        .await
        .unwrap();
    let free: Vec<String> = free.iter().map(Slot::to_string).collect();
    assert_eq!(free, ["12:00-13:00", "14:00-16:00"]);

    let other_day = h
        .service
        .free_slots(venue.id, fixtures::date("2025-06-02"))
        .await
        .unwrap();
    assert_eq!(other_day.len(), 3);

    let past = h
        .service
        .free_slots(venue.id, fixtures::date("2025-05-01"))
        .await
        .unwrap();
    assert!(past.is_empty());
}

#[tokio::test]
async fn venue_administration_requires_admin() {
    let h = harness();
    let admin = fixtures::admin();
    let member = fixtures::member("user-1");
    let new_venue = NewVenue {
        name: " Studio ".to_string(),
        capacity: 30,
        description: "Rehearsal room".to_string(),
        image_url: None,
    };

    assert!(matches!(
        h.service.create_venue(&member, new_venue.clone()).await,
        Err(BookingError::Forbidden(_))
    ));
    let created = h.service.create_venue(&admin, new_venue).await.unwrap();
    assert_eq!(created.name, "Studio");
    assert_eq!(created.status, VenueStatus::Available);
    assert!(created.availability.is_empty());

    let patch = VenuePatch {
        capacity: Some(45),
        ..VenuePatch::default()
    };
    let updated = h
        .service
        .update_venue(&admin, created.id, &patch)
        .await
        .unwrap();
    assert_eq!(updated.capacity, 45);
    assert_eq!(updated.version, Version::new(1));

    let invalid = VenuePatch {
        capacity: Some(0),
        ..VenuePatch::default()
    };
    assert!(matches!(
        h.service.update_venue(&admin, created.id, &invalid).await,
        Err(BookingError::Validation(_))
    ));

    h.service.delete_venue(&admin, created.id).await.unwrap();
    assert!(matches!(
        h.service.delete_venue(&admin, created.id).await,
        Err(BookingError::NotFound { .. })
    ));
}

// ============================================================================
// Booking reads
// ============================================================================

#[tokio::test]
async fn booking_visibility_and_ordering() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let owner = fixtures::member("user-1");
    let stranger = fixtures::member("user-2");

    let first = h
        .service
        .submit(&owner, request(&venue, "2025-06-01", &["09:00-12:00"]))
        .await
        .unwrap();
    h.clock.advance(chrono::Duration::minutes(5));
    let second = h
        .service
        .submit(&owner, request(&venue, "2025-06-02", &["09:00-12:00"]))
        .await
        .unwrap();

    let mine = h.service.my_bookings(&owner).await.unwrap();
    assert_eq!(
        mine.iter().map(|b| b.id).collect::<Vec<_>>(),
        [second[0].id, first[0].id]
    );
    assert!(h.service.my_bookings(&stranger).await.unwrap().is_empty());

    assert!(h.service.get_booking(&owner, first[0].id).await.is_ok());
    assert!(h.service.get_booking(&fixtures::admin(), first[0].id).await.is_ok());
    assert!(matches!(
        h.service.get_booking(&stranger, first[0].id).await,
        Err(BookingError::Forbidden(_))
    ));

    assert!(matches!(
        h.service.list_bookings(&owner, BookingQuery::all()).await,
        Err(BookingError::Forbidden(_))
    ));
    h.service.approve(&fixtures::admin(), first[0].id).await.unwrap();
    let pending = h
        .service
        .list_bookings(
            &fixtures::admin(),
            BookingQuery::all().with_status(BookingStatus::Pending),
        )
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second[0].id);
}

#[tokio::test]
async fn dashboard_summarises_bookings() {
    let h = harness();
    let hall = h.venue("Main Hall");
    h.venue("Garden");
    let past = h.pending(&hall, "2025-05-20", "09:00-12:00");
    let future = h.pending(&hall, "2025-06-01", "09:00-12:00");
    h.pending(&hall, "2025-06-02", "09:00-12:00");
    let admin = fixtures::admin();
    h.service.approve(&admin, past.id).await.unwrap();
    h.service.approve(&admin, future.id).await.unwrap();
    h.clock.advance(chrono::Duration::days(1));

    let stats = h.service.dashboard(&admin).await.unwrap();

    assert_eq!(stats.total_venues, 2);
    assert_eq!(stats.total_bookings, 3);
    assert_eq!(stats.pending_approvals, 1);
    assert_eq!(stats.upcoming_approved, 1);
    assert_eq!(stats.approved_per_venue[0].venue_name, "Main Hall");
    assert_eq!(stats.approved_per_venue[0].approved, 2);
    assert!(matches!(
        h.service.dashboard(&fixtures::member("user-1")).await,
        Err(BookingError::Forbidden(_))
    ));
}

#[tokio::test]
async fn change_feed_reports_submissions() {
    let h = harness();
    let venue = h.venue("Main Hall");
    let mut feed = h.service.subscribe();

    let bookings = h
        .service
        .submit(
            &fixtures::member("user-1"),
            request(&venue, "2025-06-01", &["09:00-12:00"]),
        )
        .await
        .unwrap();

    assert_eq!(
        feed.recv().await.unwrap(),
        StoreChange::BookingChanged {
            id: bookings[0].id,
            venue_id: venue.id,
            status: BookingStatus::Pending,
        }
    );
}

#[tokio::test]
async fn health_follows_store_reachability() {
    let h = harness();
    assert!(h.service.health().await.is_healthy());
    h.store.set_offline(true);
    assert!(!h.service.health().await.is_healthy());
}

// ============================================================================
// Properties
// ============================================================================

proptest::proptest! {
    #![proptest_config(proptest::prelude::ProptestConfig::with_cases(32))]

    #[test]
    fn approvals_never_leave_overlaps(slots in proptest::collection::vec(slot_strategy(), 1..8)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            let h = harness();
            let venue = h.venue("Main Hall");
            let day = fixtures::date("2025-06-01");
            let mut approved = Vec::new();

            for slot in &slots {
                let booking = h.pending(&venue, "2025-06-01", &slot.to_string());
                let report = h.service.approve(&fixtures::admin(), booking.id).await.unwrap();
                if report.outcome == ReviewOutcome::Approved {
                    approved.push(*slot);
                }
            }

            let ledger = h.store.venue(venue.id).unwrap().availability;
            let stored: Vec<Slot> = ledger.slots_on(day).iter().map(|s| s.parse().unwrap()).collect();
            assert_eq!(stored.len(), approved.len());
            for (i, a) in stored.iter().enumerate() {
                for b in &stored[i + 1..] {
                    assert!(!a.overlaps(b), "{a} overlaps {b}");
                }
            }
            for slot in &approved {
                assert!(ledger.contains(day, slot));
            }
        });
    }
}
