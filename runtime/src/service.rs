//! The booking service: the imperative shell around the pure core.
//!
//! Every operation loads documents from the [`DocumentStore`], runs the pure
//! domain logic, and writes the result back. Reviews go through
//! [`ReviewReducer`]; the effects it returns are executed here according to
//! the configured [`ConsistencyMode`].
//!
//! Venue reads prune expired ledger dates and write the pruned venue back
//! when anything changed. A failed write-back is logged and the pruned view
//! is still returned.

use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use venue_booking_core::environment::{
    Attachment, AttachmentHost, Clock, DisabledAttachmentHost, NotificationSink, Severity, SystemClock,
};
use venue_booking_core::reducer::Reducer;
use venue_booking_core::review::{
    ReviewAction, ReviewEffect, ReviewEnvironment, ReviewKind, ReviewOutcome, ReviewReducer,
    ReviewState, auto_rejected_message,
};
use venue_booking_core::stats::DashboardStats;
use venue_booking_core::status::derive_status;
use venue_booking_core::store::{
    BookingQuery, DocumentStore, ReviewCommit, StoreChange, VenueWrite,
};
use venue_booking_core::submission::{SUBMITTED_MESSAGE, SubmitBooking};
use venue_booking_core::types::{NewVenue, VenuePatch};
use venue_booking_core::{
    Booking, BookingError, BookingId, BookingStatus, Identity, Slot, SlotCatalog, SlotConflict,
    Venue, VenueId, VenueStatus,
};

use crate::health::HealthCheck;
use crate::locks::VenueLocks;
use crate::metrics::BookingMetrics;
use crate::notifier::TracingNotifier;
use crate::retry::{RetryPolicy, retry_on_conflict};

/// Notice shown when a booking was stored but its venue write failed.
pub const DEGRADED_MESSAGE: &str = "Booking updated, but venue availability may be stale";

/// Notice shown when an attachment could not be uploaded.
pub const ATTACHMENT_SKIPPED_MESSAGE: &str =
    "Attachment could not be uploaded; the request was submitted without it";

// ============================================================================
// Configuration
// ============================================================================

/// How a review's venue and booking writes reach storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyMode {
    /// Both writes commit together or not at all.
    #[default]
    Atomic,
    /// Booking first, venue second. A venue version conflict replays the
    /// ledger change on a fresh read; any other failed venue write is
    /// reported as a degraded success instead of failing the review.
    Lenient,
}

impl FromStr for ConsistencyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atomic" => Ok(Self::Atomic),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown consistency mode: {other}")),
        }
    }
}

/// Tunables for [`BookingService`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceSettings {
    /// Review write strategy.
    pub consistency: ConsistencyMode,
    /// Replays after a venue version conflict.
    pub retry: RetryPolicy,
    /// Slots offered per day.
    pub catalog: SlotCatalog,
}

/// Collaborators the service talks to.
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Venue and booking documents.
    pub store: Arc<dyn DocumentStore>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// File host for booking attachments.
    pub attachments: Arc<dyn AttachmentHost>,
    /// User-facing notices.
    pub notifier: Arc<dyn NotificationSink>,
}

impl BookingEnvironment {
    /// Production defaults around `store`: wall clock, uploads disabled,
    /// notices written to the log.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            attachments: Arc::new(DisabledAttachmentHost),
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the attachment host.
    #[must_use]
    pub fn with_attachments(mut self, attachments: Arc<dyn AttachmentHost>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Replace the notification sink.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }
}

// ============================================================================
// Requests and reports
// ============================================================================

/// Venue listing filter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueQuery {
    /// Case-insensitive substring of the venue name.
    #[serde(default, rename = "name")]
    pub name_contains: Option<String>,
}

impl VenueQuery {
    fn matches(&self, venue: &Venue) -> bool {
        self.name_contains
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
            .is_none_or(|needle| {
                venue
                    .name
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            })
    }
}

/// What a review did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReport {
    /// The booking as stored after the review.
    pub booking: Booking,
    /// The venue after the review, when it exists.
    pub venue: Option<Venue>,
    /// The decision that was applied.
    #[serde(flatten)]
    pub outcome: ReviewOutcome,
    /// The booking was stored but its venue write failed.
    pub degraded: bool,
}

/// A decided review waiting for its lenient writes.
struct LenientReview {
    booking: Booking,
    previous_status: BookingStatus,
    outcome: ReviewOutcome,
}

/// Result of replaying a venue write on a fresh read.
enum VenueReplay {
    Written(Venue),
    SlotTaken { venue: Venue, conflict: SlotConflict },
}

// ============================================================================
// Service
// ============================================================================

/// Venue and booking operations.
pub struct BookingService {
    env: BookingEnvironment,
    settings: ServiceSettings,
    reducer: ReviewReducer,
    locks: VenueLocks,
}

impl BookingService {
    /// Service with default settings.
    #[must_use]
    pub fn new(env: BookingEnvironment) -> Self {
        Self::with_settings(env, ServiceSettings::default())
    }

    /// Service with explicit settings.
    #[must_use]
    pub fn with_settings(env: BookingEnvironment, settings: ServiceSettings) -> Self {
        Self {
            env,
            settings,
            reducer: ReviewReducer::new(),
            locks: VenueLocks::new(),
        }
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    fn store(&self) -> &dyn DocumentStore {
        self.env.store.as_ref()
    }

    fn require_admin(identity: &Identity) -> Result<(), BookingError> {
        if identity.is_admin() {
            Ok(())
        } else {
            Err(BookingError::Forbidden(
                "administrator role required".to_string(),
            ))
        }
    }

    // ------------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------------

    /// Create one pending booking per requested slot.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for an invalid request
    /// - [`BookingError::NotFound`] if the venue does not exist
    /// - [`BookingError::SlotUnavailable`] if a slot is already taken
    /// - [`BookingError::PersistenceFailure`] if the bookings cannot be stored
    #[tracing::instrument(
        skip(self, identity, request),
        fields(venue_id = %request.venue_id, user_id = %identity.user_id, date = %request.date)
    )]
    pub async fn submit(
        &self,
        identity: &Identity,
        mut request: SubmitBooking,
    ) -> Result<Vec<Booking>, BookingError> {
        request.validate(self.env.clock.today())?;
        let venue = self.get_venue(request.venue_id).await?;
        request.ensure_available(&venue.availability)?;

        let attachment_url = match request.attachment.take() {
            Some(attachment) => self.upload_attachment(attachment).await,
            None => None,
        };

        let bookings =
            request.into_bookings(identity, &venue, attachment_url.as_deref(), self.env.clock.now());
        let stored = self.store().insert_bookings(bookings).await?;

        BookingMetrics::record_submission(stored.len());
        tracing::info!(count = stored.len(), "Booking request submitted");
        self.env.notifier.notify(SUBMITTED_MESSAGE, Severity::Success);
        self.env.notifier.announce(SUBMITTED_MESSAGE);
        Ok(stored)
    }

    async fn upload_attachment(
        &self,
        attachment: Attachment,
    ) -> Option<String> {
        let file_name = attachment.file_name.clone();
        match self.env.attachments.upload(attachment).await {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!(file_name = %file_name, error = %err, "Attachment upload failed, continuing without it");
                BookingMetrics::record_attachment_failure();
                self.env
                    .notifier
                    .notify(ATTACHMENT_SKIPPED_MESSAGE, Severity::Info);
                None
            }
        }
    }

    // ------------------------------------------------------------------------
    // Review
    // ------------------------------------------------------------------------

    /// Approve a pending booking. A slot conflict turns the approval into an
    /// auto-rejection, reported through [`ReviewReport::outcome`].
    ///
    /// # Errors
    ///
    /// See [`BookingService::review`].
    pub async fn approve(
        &self,
        identity: &Identity,
        booking_id: BookingId,
    ) -> Result<ReviewReport, BookingError> {
        self.review(identity, booking_id, ReviewKind::Approve).await
    }

    /// Reject a pending booking, or revoke an approved one.
    ///
    /// # Errors
    ///
    /// See [`BookingService::review`].
    pub async fn reject(
        &self,
        identity: &Identity,
        booking_id: BookingId,
    ) -> Result<ReviewReport, BookingError> {
        self.review(identity, booking_id, ReviewKind::Reject).await
    }

    /// Revoke an approved booking and free its slot.
    ///
    /// # Errors
    ///
    /// See [`BookingService::review`].
    pub async fn revoke(
        &self,
        identity: &Identity,
        booking_id: BookingId,
    ) -> Result<ReviewReport, BookingError> {
        self.review(identity, booking_id, ReviewKind::Revoke).await
    }

    /// Apply a review decision.
    ///
    /// Reviews of one venue run one at a time in this process. When another
    /// process changed the venue in between, the review is replayed from a
    /// fresh read according to the retry policy.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] if the booking, or for approve/revoke its
    ///   venue, does not exist
    /// - [`BookingError::Forbidden`] if `identity` is not an administrator
    /// - [`BookingError::InvalidTransition`] if the booking's status does not
    ///   allow the decision
    /// - [`BookingError::Conflict`] if the venue kept changing
    /// - [`BookingError::StaleBooking`] if the booking kept changing
    /// - [`BookingError::PersistenceFailure`] if a write fails in atomic mode
    #[tracing::instrument(skip(self, identity), fields(reviewer = %identity.email))]
    pub async fn review(
        &self,
        identity: &Identity,
        booking_id: BookingId,
        kind: ReviewKind,
    ) -> Result<ReviewReport, BookingError> {
        let started = Instant::now();
        let booking = self
            .store()
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(booking_id))?;

        let _venue_guard = self.locks.acquire(booking.venue_id).await;
        let report = retry_on_conflict(&self.settings.retry, move || {
            self.review_once(identity, booking_id, kind)
        })
        .await?;

        BookingMetrics::record_review(&report.outcome, started.elapsed());
        tracing::info!(
            venue_id = %report.booking.venue_id,
            outcome = report.outcome.label(),
            degraded = report.degraded,
            "Booking reviewed"
        );
        Ok(report)
    }

    async fn review_once(
        &self,
        identity: &Identity,
        booking_id: BookingId,
        kind: ReviewKind,
    ) -> Result<ReviewReport, BookingError> {
        let booking = self
            .store()
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(booking_id))?;
        let venue = self.store().get_venue(booking.venue_id).await?;
        let previous_status = booking.status;

        let mut state = ReviewState::new(booking, venue);
        let env = ReviewEnvironment::new(Arc::clone(&self.env.clock));
        let effects = self
            .reducer
            .reduce(&mut state, ReviewAction::new(kind, identity.clone()), &env);

        let outcome = match state.outcome.take() {
            Some(ReviewOutcome::Denied { denial }) => return Err(denial.into_error(&state.booking)),
            Some(outcome) => outcome,
            None => {
                return Err(BookingError::InvalidTransition {
                    from: state.booking.status,
                    action: kind,
                });
            }
        };

        let mut venue_write = None;
        let mut booking_write = None;
        let mut notices = Vec::new();
        for effect in effects {
            match effect {
                ReviewEffect::SaveVenue {
                    venue,
                    expected_version,
                } => {
                    venue_write = Some(VenueWrite {
                        venue,
                        expected_version,
                    });
                }
                ReviewEffect::SaveBooking { booking } => booking_write = Some(booking),
                notice => notices.push(notice),
            }
        }
        let booking = booking_write.unwrap_or_else(|| state.booking.clone());
        let approving = outcome == ReviewOutcome::Approved;

        let report = match self.settings.consistency {
            ConsistencyMode::Atomic => {
                let committed = self
                    .store()
                    .commit_review(ReviewCommit {
                        venue: venue_write,
                        booking,
                        expected_status: previous_status,
                    })
                    .await?;
                ReviewReport {
                    booking: committed.booking,
                    venue: committed.venue.or(state.venue),
                    outcome,
                    degraded: false,
                }
            }
            ConsistencyMode::Lenient => {
                let decided = LenientReview {
                    booking,
                    previous_status,
                    outcome,
                };
                self.write_leniently(decided, venue_write, state.venue).await?
            }
        };

        // An approval that lost its slot during a lenient venue replay.
        if approving {
            if let ReviewOutcome::AutoRejected { conflict } = &report.outcome {
                notices = vec![ReviewEffect::Notify {
                    message: auto_rejected_message(conflict, report.booking.date),
                    severity: Severity::Error,
                }];
            }
        }

        for notice in notices {
            match notice {
                ReviewEffect::Notify { message, severity } => {
                    self.env.notifier.notify(&message, severity);
                }
                ReviewEffect::Announce { text } => self.env.notifier.announce(&text),
                ReviewEffect::SaveVenue { .. } | ReviewEffect::SaveBooking { .. } => {}
            }
        }
        if report.degraded {
            self.env.notifier.notify(DEGRADED_MESSAGE, Severity::Error);
        }

        Ok(report)
    }

    /// Booking first, then venue.
    ///
    /// Once the booking is stored the review is not replayed from scratch.
    /// A venue version conflict replays only the ledger change on a fresh
    /// read; an approval whose slot was taken in the meantime is written
    /// back as an auto-rejection. Any other venue failure degrades instead
    /// of failing.
    async fn write_leniently(
        &self,
        decided: LenientReview,
        venue_write: Option<VenueWrite>,
        fallback_venue: Option<Venue>,
    ) -> Result<ReviewReport, BookingError> {
        let LenientReview {
            booking,
            previous_status,
            outcome,
        } = decided;
        let booking = self.store().save_booking(booking, previous_status).await?;
        let Some(write) = venue_write else {
            return Ok(ReviewReport {
                booking,
                venue: fallback_venue,
                outcome,
                degraded: false,
            });
        };

        let venue_id = write.venue.id;
        let err = match self
            .store()
            .save_venue(write.venue, write.expected_version)
            .await
        {
            Ok(venue) => {
                return Ok(ReviewReport {
                    booking,
                    venue: Some(venue),
                    outcome,
                    degraded: false,
                });
            }
            Err(err) => BookingError::from(err),
        };

        let replayed = if err.is_retryable() {
            tracing::debug!(%venue_id, booking_id = %booking.id, "Venue moved after booking update, replaying ledger change");
            let (stored, decided) = (&booking, &outcome);
            retry_on_conflict(&self.settings.retry, move || {
                self.replay_venue_write(venue_id, stored, decided)
            })
            .await
        } else {
            Err(err)
        };

        match replayed {
            Ok(VenueReplay::Written(venue)) => Ok(ReviewReport {
                booking,
                venue: Some(venue),
                outcome,
                degraded: false,
            }),
            Ok(VenueReplay::SlotTaken { venue, conflict }) => {
                tracing::warn!(
                    %venue_id,
                    booking_id = %booking.id,
                    %conflict,
                    "Approved slot was taken before the venue write landed, rejecting"
                );
                let mut rejected = booking;
                rejected.status = BookingStatus::Rejected;
                rejected.reviewed_at = Some(self.env.clock.now());
                let booking = self
                    .store()
                    .save_booking(rejected, BookingStatus::Approved)
                    .await?;
                Ok(ReviewReport {
                    booking,
                    venue: Some(venue),
                    outcome: ReviewOutcome::AutoRejected { conflict },
                    degraded: false,
                })
            }
            Err(err) => {
                tracing::warn!(
                    %venue_id,
                    booking_id = %booking.id,
                    error = %err,
                    "Venue write failed after booking update"
                );
                BookingMetrics::record_degraded_write();
                let stored = self.store().get_venue(venue_id).await.ok().flatten();
                Ok(ReviewReport {
                    booking,
                    venue: stored,
                    outcome,
                    degraded: true,
                })
            }
        }
    }

    /// Re-apply a stored review's ledger change to the current venue.
    async fn replay_venue_write(
        &self,
        venue_id: VenueId,
        booking: &Booking,
        outcome: &ReviewOutcome,
    ) -> Result<VenueReplay, BookingError> {
        let mut venue = self
            .store()
            .get_venue(venue_id)
            .await?
            .ok_or_else(|| BookingError::venue_not_found(venue_id))?;
        let expected = venue.version;

        match ReviewReducer::replay_ledger(outcome, booking, &mut venue, self.env.clock.now()) {
            Ok(true) => Ok(VenueReplay::Written(
                self.store().save_venue(venue, expected).await?,
            )),
            Ok(false) => Ok(VenueReplay::Written(venue)),
            Err(conflict) => Ok(VenueReplay::SlotTaken { venue, conflict }),
        }
    }

    // ------------------------------------------------------------------------
    // Venue reads
    // ------------------------------------------------------------------------

    /// Prune `venue` and write it back if anything changed.
    ///
    /// Returns the venue to show and whether it was rewritten.
    async fn refresh(&self, mut venue: Venue) -> (Venue, bool) {
        let expected = venue.version;
        if !venue.refresh_availability(self.env.clock.today()) {
            return (venue, false);
        }
        venue.updated_at = self.env.clock.now();

        match self.store().save_venue(venue.clone(), expected).await {
            Ok(stored) => {
                BookingMetrics::record_prune();
                tracing::debug!(venue_id = %stored.id, version = %stored.version, "Pruned expired availability");
                (stored, true)
            }
            Err(err) => {
                tracing::warn!(venue_id = %venue.id, error = %err, "Failed to persist pruned availability");
                (venue, false)
            }
        }
    }

    /// One venue, with expired dates pruned.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] if the venue does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_venue(&self, venue_id: VenueId) -> Result<Venue, BookingError> {
        let venue = self
            .store()
            .get_venue(venue_id)
            .await?
            .ok_or_else(|| BookingError::venue_not_found(venue_id))?;
        Ok(self.refresh(venue).await.0)
    }

    /// Venues matching `query`, sorted by name, with expired dates pruned.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::PersistenceFailure`] if the listing fails.
    #[tracing::instrument(skip(self))]
    pub async fn list_venues(&self, query: &VenueQuery) -> Result<Vec<Venue>, BookingError> {
        let venues = self.store().list_venues().await?;
        let refreshed = join_all(
            venues
                .into_iter()
                .filter(|venue| query.matches(venue))
                .map(|venue| self.refresh(venue)),
        )
        .await;

        let mut venues: Vec<Venue> = refreshed.into_iter().map(|(venue, _)| venue).collect();
        venues.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.as_uuid().cmp(b.id.as_uuid())));
        Ok(venues)
    }

    /// Catalog slots that could still be approved on `date`.
    ///
    /// Dates before today have no free slots.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] if the venue does not exist.
    pub async fn free_slots(
        &self,
        venue_id: VenueId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, BookingError> {
        let venue = self.get_venue(venue_id).await?;
        if date < self.env.clock.today() {
            return Ok(Vec::new());
        }
        Ok(self.settings.catalog.free_slots(&venue.availability, date))
    }

    /// Prune every venue and return how many were rewritten.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Forbidden`] for non-administrators
    /// - [`BookingError::PersistenceFailure`] if the listing fails
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn refresh_all_venues(&self, identity: &Identity) -> Result<usize, BookingError> {
        Self::require_admin(identity)?;
        let venues = self.store().list_venues().await?;
        let total = venues.len();
        let rewritten = join_all(venues.into_iter().map(|venue| self.refresh(venue)))
            .await
            .into_iter()
            .filter(|(_, written)| *written)
            .count();
        tracing::info!(total, rewritten, "Venue availability refreshed");
        Ok(rewritten)
    }

    // ------------------------------------------------------------------------
    // Venue administration
    // ------------------------------------------------------------------------

    /// Create a venue with an empty ledger.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Forbidden`] for non-administrators
    /// - [`BookingError::Validation`] for a blank name or zero capacity
    #[tracing::instrument(skip(self, identity, new_venue), fields(user_id = %identity.user_id))]
    pub async fn create_venue(
        &self,
        identity: &Identity,
        new_venue: NewVenue,
    ) -> Result<Venue, BookingError> {
        Self::require_admin(identity)?;
        let venue = new_venue.into_venue(self.env.clock.now())?;
        let venue = self.store().insert_venue(venue).await?;
        tracing::info!(venue_id = %venue.id, name = %venue.name, "Venue created");
        self.env
            .notifier
            .notify("Venue created successfully", Severity::Success);
        Ok(venue)
    }

    /// Change a venue's descriptive fields.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Forbidden`] for non-administrators
    /// - [`BookingError::NotFound`] if the venue does not exist
    /// - [`BookingError::Validation`] if the patch is invalid
    #[tracing::instrument(skip(self, identity, patch), fields(user_id = %identity.user_id))]
    pub async fn update_venue(
        &self,
        identity: &Identity,
        venue_id: VenueId,
        patch: &VenuePatch,
    ) -> Result<Venue, BookingError> {
        Self::require_admin(identity)?;
        self.modify_venue(venue_id, |venue| patch.apply(venue)).await
    }

    /// Put a venue into maintenance, or take it out again.
    ///
    /// Leaving maintenance re-derives the status from the pruned ledger.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Forbidden`] for non-administrators
    /// - [`BookingError::NotFound`] if the venue does not exist
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn set_maintenance(
        &self,
        identity: &Identity,
        venue_id: VenueId,
        maintenance: bool,
    ) -> Result<Venue, BookingError> {
        Self::require_admin(identity)?;
        let today = self.env.clock.today();
        self.modify_venue(venue_id, |venue| {
            venue.availability.prune_expired(today);
            venue.status = if maintenance {
                VenueStatus::Maintenance
            } else {
                derive_status(VenueStatus::Available, &venue.availability)
            };
            Ok(())
        })
        .await
    }

    /// Load, change and save a venue under its lock, replaying on conflict.
    async fn modify_venue<F>(&self, venue_id: VenueId, change: F) -> Result<Venue, BookingError>
    where
        F: Fn(&mut Venue) -> Result<(), BookingError>,
    {
        let _venue_guard = self.locks.acquire(venue_id).await;
        let change = &change;
        retry_on_conflict(&self.settings.retry, move || async move {
            let mut venue = self
                .store()
                .get_venue(venue_id)
                .await?
                .ok_or_else(|| BookingError::venue_not_found(venue_id))?;
            let expected = venue.version;
            change(&mut venue)?;
            venue.updated_at = self.env.clock.now();
            Ok(self.store().save_venue(venue, expected).await?)
        })
        .await
    }

    /// Delete a venue. Its bookings are left in place.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Forbidden`] for non-administrators
    /// - [`BookingError::NotFound`] if the venue does not exist
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn delete_venue(
        &self,
        identity: &Identity,
        venue_id: VenueId,
    ) -> Result<(), BookingError> {
        Self::require_admin(identity)?;
        let _venue_guard = self.locks.acquire(venue_id).await;
        if !self.store().delete_venue(venue_id).await? {
            return Err(BookingError::venue_not_found(venue_id));
        }
        tracing::info!("Venue deleted");
        self.env.notifier.notify("Venue deleted", Severity::Info);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Booking reads
    // ------------------------------------------------------------------------

    /// One booking, visible to its owner and to administrators.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] if the booking does not exist
    /// - [`BookingError::Forbidden`] if `identity` may not see it
    pub async fn get_booking(
        &self,
        identity: &Identity,
        booking_id: BookingId,
    ) -> Result<Booking, BookingError> {
        let booking = self
            .store()
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(booking_id))?;
        if booking.user_id != identity.user_id && !identity.is_admin() {
            return Err(BookingError::Forbidden(
                "bookings are visible to their owner and administrators".to_string(),
            ));
        }
        Ok(booking)
    }

    /// Bookings matching `query`, newest first. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Forbidden`] for non-administrators.
    pub async fn list_bookings(
        &self,
        identity: &Identity,
        query: BookingQuery,
    ) -> Result<Vec<Booking>, BookingError> {
        Self::require_admin(identity)?;
        let mut bookings = self.store().list_bookings(query).await?;
        newest_first(&mut bookings);
        Ok(bookings)
    }

    /// The caller's own bookings, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::PersistenceFailure`] if the listing fails.
    pub async fn my_bookings(&self, identity: &Identity) -> Result<Vec<Booking>, BookingError> {
        let mut bookings = self
            .store()
            .list_bookings(BookingQuery::for_user(identity.user_id.clone()))
            .await?;
        newest_first(&mut bookings);
        Ok(bookings)
    }

    /// Administrator dashboard figures.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Forbidden`] for non-administrators.
    pub async fn dashboard(&self, identity: &Identity) -> Result<DashboardStats, BookingError> {
        Self::require_admin(identity)?;
        let (venues, bookings) = futures::try_join!(
            self.store().list_venues(),
            self.store().list_bookings(BookingQuery::all())
        )?;
        Ok(DashboardStats::compute(
            &venues,
            &bookings,
            self.env.clock.today(),
        ))
    }

    /// Live feed of venue and booking changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.store().subscribe()
    }

    /// Readiness of the backing store.
    pub async fn health(&self) -> HealthCheck {
        let started = Instant::now();
        match self.store().ping().await {
            Ok(()) => HealthCheck::healthy("document_store").with_latency(started.elapsed()),
            Err(err) => {
                tracing::warn!(error = %err, "Document store health check failed");
                HealthCheck::unhealthy("document_store", err.to_string())
            }
        }
    }
}

fn newest_first(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
