//! Booking review state machine.
//!
//! Transitions:
//!
//! ```text
//! pending  --approve--> approved      (slot added to the venue ledger)
//! pending  --approve--> rejected      (auto-rejection on slot conflict)
//! pending  --reject---> rejected
//! approved --revoke---> rejected      (slot removed from the venue ledger)
//! ```
//!
//! [`ReviewReducer`] mutates a [`ReviewState`] in place and returns the
//! writes and notices to perform as [`ReviewEffect`] values. It performs no
//! I/O; the runtime decides how the writes reach storage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::fmt;
use std::sync::Arc;

use crate::conflict::SlotConflict;
use crate::environment::{Clock, Severity};
use crate::error::BookingError;
use crate::reducer::Reducer;
use crate::status::derive_status;
use crate::types::{Booking, BookingStatus, Identity, Venue, Version};

/// Spoken after an approval.
pub const APPROVED_ANNOUNCEMENT: &str = "Your booking has been approved.";
/// Spoken after an explicit rejection.
pub const REJECTED_ANNOUNCEMENT: &str = "Your booking has been rejected.";
/// Notice shown to the reviewer after a revocation.
pub const REVOKED_MESSAGE: &str = "Approved booking revoked; the time slot is free again";

/// Notice shown to the reviewer after an approval.
#[must_use]
pub fn approved_message(venue_name: &str) -> String {
    format!("Booking for {venue_name} approved!")
}

/// Notice shown to the reviewer after an explicit rejection.
#[must_use]
pub fn rejected_message(venue_name: &str) -> String {
    format!("Booking for {venue_name} rejected.")
}

/// Notice shown when an approval was turned into a rejection.
#[must_use]
pub fn auto_rejected_message(conflict: &SlotConflict, date: NaiveDate) -> String {
    let day = date.format("%b %d, %Y");
    match conflict {
        SlotConflict::DuplicateSlot { slot } => {
            format!("Time slot {slot} is already booked for {day}.")
        }
        SlotConflict::Overlap { .. } => {
            format!("Time slot overlaps with existing booking for {day}.")
        }
    }
}

// ============================================================================
// Actions, effects, outcomes
// ============================================================================

/// The three review decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewKind {
    /// Grant the requested slot.
    Approve,
    /// Decline; revokes when the booking is already approved.
    Reject,
    /// Withdraw an approval.
    Revoke,
}

impl fmt::Display for ReviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Revoke => "revoke",
        })
    }
}

/// Reviewer input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReviewAction {
    /// Approve a pending booking.
    Approve {
        /// Who decided.
        reviewer: Identity,
    },
    /// Reject a pending booking, or revoke an approved one.
    Reject {
        /// Who decided.
        reviewer: Identity,
    },
    /// Revoke an approved booking.
    Revoke {
        /// Who decided.
        reviewer: Identity,
    },
}

impl ReviewAction {
    /// The decision kind.
    #[must_use]
    pub const fn kind(&self) -> ReviewKind {
        match self {
            Self::Approve { .. } => ReviewKind::Approve,
            Self::Reject { .. } => ReviewKind::Reject,
            Self::Revoke { .. } => ReviewKind::Revoke,
        }
    }

    /// The acting reviewer.
    #[must_use]
    pub const fn reviewer(&self) -> &Identity {
        match self {
            Self::Approve { reviewer } | Self::Reject { reviewer } | Self::Revoke { reviewer } => {
                reviewer
            }
        }
    }

    /// Build the action for `kind`.
    #[must_use]
    pub const fn new(kind: ReviewKind, reviewer: Identity) -> Self {
        match kind {
            ReviewKind::Approve => Self::Approve { reviewer },
            ReviewKind::Reject => Self::Reject { reviewer },
            ReviewKind::Revoke => Self::Revoke { reviewer },
        }
    }
}

/// Work the runtime performs after a review.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReviewEffect {
    /// Persist the venue if its stored version still equals `expected_version`.
    SaveVenue {
        /// New venue contents.
        venue: Venue,
        /// Version the reducer started from.
        expected_version: Version,
    },
    /// Persist the reviewed booking.
    SaveBooking {
        /// New booking contents.
        booking: Booking,
    },
    /// Show a transient notice.
    Notify {
        /// Text.
        message: String,
        /// Presentation.
        severity: Severity,
    },
    /// Speak a short confirmation.
    Announce {
        /// Text.
        text: String,
    },
}

/// Why a review was refused without changing anything.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ReviewDenial {
    /// Reviewer is not an administrator.
    Forbidden,
    /// The booking's status does not allow the action.
    InvalidTransition {
        /// Current status.
        from: BookingStatus,
        /// Attempted action.
        action: ReviewKind,
    },
    /// The booking's venue no longer exists.
    VenueMissing,
}

impl ReviewDenial {
    /// The caller-facing error for this denial.
    #[must_use]
    pub fn into_error(self, booking: &Booking) -> BookingError {
        match self {
            Self::Forbidden => {
                BookingError::Forbidden("only administrators may review bookings".to_string())
            }
            Self::InvalidTransition { from, action } => {
                BookingError::InvalidTransition { from, action }
            }
            Self::VenueMissing => BookingError::venue_not_found(booking.venue_id),
        }
    }
}

/// Result of one review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// The slot was granted.
    Approved,
    /// Approval hit a conflict; the booking was rejected instead.
    AutoRejected {
        /// The conflict that blocked approval.
        conflict: SlotConflict,
    },
    /// A pending booking was declined.
    Rejected,
    /// An approved booking was withdrawn.
    Revoked,
    /// Nothing happened.
    Denied {
        /// Why.
        denial: ReviewDenial,
    },
}

impl ReviewOutcome {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::AutoRejected { .. } => "auto_rejected",
            Self::Rejected => "rejected",
            Self::Revoked => "revoked",
            Self::Denied { .. } => "denied",
        }
    }
}

// ============================================================================
// State and environment
// ============================================================================

/// A booking under review together with its venue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewState {
    /// The booking being reviewed.
    pub booking: Booking,
    /// Its venue, if it still exists.
    pub venue: Option<Venue>,
    /// Set by the reducer.
    pub outcome: Option<ReviewOutcome>,
}

impl ReviewState {
    /// State before any decision.
    #[must_use]
    pub const fn new(booking: Booking, venue: Option<Venue>) -> Self {
        Self {
            booking,
            venue,
            outcome: None,
        }
    }
}

/// Dependencies of [`ReviewReducer`].
#[derive(Clone)]
pub struct ReviewEnvironment {
    /// Supplies audit timestamps and "today" for pruning.
    pub clock: Arc<dyn Clock>,
}

impl ReviewEnvironment {
    /// Environment using `clock`.
    #[must_use]
    pub const fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

type Effects = SmallVec<[ReviewEffect; 4]>;

/// Pure review state machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReviewReducer;

impl ReviewReducer {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn deny(state: &mut ReviewState, denial: ReviewDenial) -> Effects {
        state.outcome = Some(ReviewOutcome::Denied { denial });
        SmallVec::new()
    }

    fn approve(state: &mut ReviewState, reviewer: &Identity, now: DateTime<Utc>) -> Effects {
        let Some(venue) = state.venue.as_mut() else {
            return Self::deny(state, ReviewDenial::VenueMissing);
        };
        let expected_version = venue.version;
        let refreshed = venue.refresh_availability(now.date_naive());
        let date = state.booking.date;
        let slot = state.booking.slot;

        match venue.availability.check(date, &slot) {
            Err(conflict) => {
                state
                    .booking
                    .mark_reviewed(BookingStatus::Rejected, reviewer, now);
                let mut effects = Effects::new();
                if refreshed {
                    venue.updated_at = now;
                    effects.push(ReviewEffect::SaveVenue {
                        venue: venue.clone(),
                        expected_version,
                    });
                }
                effects.push(ReviewEffect::SaveBooking {
                    booking: state.booking.clone(),
                });
                effects.push(ReviewEffect::Notify {
                    message: auto_rejected_message(&conflict, date),
                    severity: Severity::Error,
                });
                state.outcome = Some(ReviewOutcome::AutoRejected { conflict });
                effects
            }
            Ok(()) => {
                venue.availability.add_slot(date, &slot);
                venue.status = derive_status(venue.status, &venue.availability);
                venue.updated_at = now;
                state
                    .booking
                    .mark_reviewed(BookingStatus::Approved, reviewer, now);
                state.outcome = Some(ReviewOutcome::Approved);
                smallvec![
                    ReviewEffect::SaveVenue {
                        venue: venue.clone(),
                        expected_version,
                    },
                    ReviewEffect::SaveBooking {
                        booking: state.booking.clone(),
                    },
                    ReviewEffect::Notify {
                        message: approved_message(&state.booking.venue_name),
                        severity: Severity::Success,
                    },
                    ReviewEffect::Announce {
                        text: APPROVED_ANNOUNCEMENT.to_string(),
                    },
                ]
            }
        }
    }

    fn reject(state: &mut ReviewState, reviewer: &Identity, now: DateTime<Utc>) -> Effects {
        state
            .booking
            .mark_reviewed(BookingStatus::Rejected, reviewer, now);
        state.outcome = Some(ReviewOutcome::Rejected);
        smallvec![
            ReviewEffect::SaveBooking {
                booking: state.booking.clone(),
            },
            ReviewEffect::Notify {
                message: rejected_message(&state.booking.venue_name),
                severity: Severity::Error,
            },
            ReviewEffect::Announce {
                text: REJECTED_ANNOUNCEMENT.to_string(),
            },
        ]
    }

    fn revoke(state: &mut ReviewState, reviewer: &Identity, now: DateTime<Utc>) -> Effects {
        let Some(venue) = state.venue.as_mut() else {
            return Self::deny(state, ReviewDenial::VenueMissing);
        };
        let expected_version = venue.version;
        venue.availability.prune_expired(now.date_naive());
        venue
            .availability
            .remove_slot(state.booking.date, &state.booking.slot);
        venue.status = derive_status(venue.status, &venue.availability);
        venue.updated_at = now;
        state
            .booking
            .mark_reviewed(BookingStatus::Rejected, reviewer, now);
        state.outcome = Some(ReviewOutcome::Revoked);
        smallvec![
            ReviewEffect::SaveVenue {
                venue: venue.clone(),
                expected_version,
            },
            ReviewEffect::SaveBooking {
                booking: state.booking.clone(),
            },
            ReviewEffect::Notify {
                message: REVOKED_MESSAGE.to_string(),
                severity: Severity::Info,
            },
        ]
    }

    /// Re-apply the ledger change of an already-decided review to a freshly
    /// read `venue`.
    ///
    /// Used when the booking write has landed but the venue write lost a
    /// version race. Returns whether `venue` changed and must be written.
    ///
    /// # Errors
    ///
    /// Returns the [`SlotConflict`] when an approved slot is no longer free
    /// on the fresh ledger.
    pub fn replay_ledger(
        outcome: &ReviewOutcome,
        booking: &Booking,
        venue: &mut Venue,
        now: DateTime<Utc>,
    ) -> Result<bool, SlotConflict> {
        let changed = match outcome {
            ReviewOutcome::Approved => {
                venue.refresh_availability(now.date_naive());
                venue.availability.check(booking.date, &booking.slot)?;
                venue.availability.add_slot(booking.date, &booking.slot);
                venue.status = derive_status(venue.status, &venue.availability);
                true
            }
            ReviewOutcome::Revoked => {
                venue.availability.prune_expired(now.date_naive());
                venue.availability.remove_slot(booking.date, &booking.slot);
                venue.status = derive_status(venue.status, &venue.availability);
                true
            }
            ReviewOutcome::AutoRejected { .. } => venue.refresh_availability(now.date_naive()),
            ReviewOutcome::Rejected | ReviewOutcome::Denied { .. } => false,
        };
        if changed {
            venue.updated_at = now;
        }
        Ok(changed)
    }
}

impl Reducer for ReviewReducer {
    type State = ReviewState;
    type Action = ReviewAction;
    type Environment = ReviewEnvironment;
    type Effect = ReviewEffect;

    fn reduce(
        &self,
        state: &mut ReviewState,
        action: ReviewAction,
        env: &ReviewEnvironment,
    ) -> Effects {
        let reviewer = action.reviewer();
        if !reviewer.is_admin() {
            return Self::deny(state, ReviewDenial::Forbidden);
        }
        let now = env.clock.now();

        match (action.kind(), state.booking.status) {
            (ReviewKind::Approve, BookingStatus::Pending) => Self::approve(state, reviewer, now),
            (ReviewKind::Reject, BookingStatus::Pending) => Self::reject(state, reviewer, now),
            (ReviewKind::Reject | ReviewKind::Revoke, BookingStatus::Approved) => {
                Self::revoke(state, reviewer, now)
            }
            (action, from) => Self::deny(state, ReviewDenial::InvalidTransition { from, action }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ledger::AvailabilityLedger;
    use crate::types::{BookingId, Role, UserId, VenueStatus};
    use chrono::{NaiveDate, TimeZone};

    struct At(DateTime<Utc>);

    impl Clock for At {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn env() -> ReviewEnvironment {
        ReviewEnvironment::new(Arc::new(At(Utc
            .with_ymd_and_hms(2025, 5, 20, 10, 0, 0)
            .unwrap())))
    }

    fn admin() -> Identity {
        Identity::new("admin-1", "admin@example.com", Role::Admin)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn venue() -> Venue {
        Venue::builder("Main Hall", 100).build(Utc::now())
    }

    fn booking(venue: &Venue, day: &str, slot: &str, status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::new(),
            venue_id: venue.id,
            venue_name: venue.name.clone(),
            user_id: UserId::new("user-1"),
            user_email: "user@example.com".into(),
            date: date(day),
            slot: slot.parse().unwrap(),
            purpose: "Seminar".into(),
            attachment_url: None,
            status,
            created_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
        }
    }

    fn run(state: &mut ReviewState, action: ReviewAction) -> Effects {
        ReviewReducer::new().reduce(state, action, &env())
    }

    #[test]
    fn approval_adds_slot_and_marks_venue_booked() {
        let v = venue();
        let b = booking(&v, "2025-06-01", "09:00-12:00", BookingStatus::Pending);
        let mut state = ReviewState::new(b, Some(v));

        let effects = run(&mut state, ReviewAction::Approve { reviewer: admin() });

        assert_eq!(state.outcome, Some(ReviewOutcome::Approved));
        let venue = state.venue.as_ref().unwrap();
        assert_eq!(venue.availability.slots_on(date("2025-06-01")), ["09:00-12:00"]);
        assert_eq!(venue.status, VenueStatus::Booked);
        assert_eq!(state.booking.status, BookingStatus::Approved);
        assert_eq!(state.booking.reviewed_by.as_deref(), Some("admin-1"));
        assert!(matches!(
            effects[2],
            ReviewEffect::Notify { ref message, severity: Severity::Success }
                if message == "Booking for Main Hall approved!"
        ));
        assert!(matches!(
            effects[0],
            ReviewEffect::SaveVenue { expected_version, .. } if expected_version == Version::INITIAL
        ));
        assert!(matches!(effects[1], ReviewEffect::SaveBooking { .. }));
    }

    #[test]
    fn duplicate_approval_is_auto_rejected() {
        let mut v = venue();
        v.availability.add_slot(date("2025-06-01"), &"09:00-12:00".parse().unwrap());
        v.status = VenueStatus::Booked;
        let b = booking(&v, "2025-06-01", "09:00-12:00", BookingStatus::Pending);
        let mut state = ReviewState::new(b, Some(v.clone()));

        let effects = run(&mut state, ReviewAction::Approve { reviewer: admin() });

        assert!(matches!(
            state.outcome,
            Some(ReviewOutcome::AutoRejected {
                conflict: SlotConflict::DuplicateSlot { .. }
            })
        ));
        assert_eq!(state.booking.status, BookingStatus::Rejected);
        assert!(state.booking.reviewed_at.is_some());
        assert_eq!(state.venue.as_ref().unwrap().availability, v.availability);
        // Nothing was pruned, so the venue is not rewritten.
        assert!(!effects.iter().any(|e| matches!(e, ReviewEffect::SaveVenue { .. })));
    }

    #[test]
    fn auto_rejection_still_persists_pruned_ledger() {
        let mut v = venue();
        v.availability.add_slot(date("2025-05-01"), &"09:00-12:00".parse().unwrap());
        v.availability.add_slot(date("2025-06-01"), &"09:00-12:00".parse().unwrap());
        v.status = VenueStatus::Booked;
        let b = booking(&v, "2025-06-01", "11:00-13:00", BookingStatus::Pending);
        let mut state = ReviewState::new(b, Some(v));

        let effects = run(&mut state, ReviewAction::Approve { reviewer: admin() });

        assert!(matches!(
            state.outcome,
            Some(ReviewOutcome::AutoRejected {
                conflict: SlotConflict::Overlap { .. }
            })
        ));
        let saved = effects.iter().find_map(|e| match e {
            ReviewEffect::SaveVenue { venue, .. } => Some(venue),
            _ => None,
        });
        let saved = saved.unwrap();
        assert_eq!(saved.availability.dates().collect::<Vec<_>>(), ["2025-06-01"]);
    }

    #[test]
    fn explicit_rejection_leaves_venue_untouched() {
        let v = venue();
        let b = booking(&v, "2025-06-01", "09:00-12:00", BookingStatus::Pending);
        let mut state = ReviewState::new(b, None);

        let effects = run(&mut state, ReviewAction::Reject { reviewer: admin() });

        assert_eq!(state.outcome, Some(ReviewOutcome::Rejected));
        assert_eq!(state.booking.status, BookingStatus::Rejected);
        assert!(!effects.iter().any(|e| matches!(e, ReviewEffect::SaveVenue { .. })));
    }

    #[test]
    fn revocation_releases_slot_and_reverts_status() {
        let mut v = venue();
        v.availability.add_slot(date("2025-06-01"), &"09:00-12:00".parse().unwrap());
        v.status = VenueStatus::Booked;
        let b = booking(&v, "2025-06-01", "09:00-12:00", BookingStatus::Approved);
        let mut state = ReviewState::new(b, Some(v));

        run(&mut state, ReviewAction::Revoke { reviewer: admin() });

        assert_eq!(state.outcome, Some(ReviewOutcome::Revoked));
        let venue = state.venue.as_ref().unwrap();
        assert_eq!(venue.availability, AvailabilityLedger::new());
        assert_eq!(venue.status, VenueStatus::Available);
        assert_eq!(state.booking.status, BookingStatus::Rejected);
    }

    #[test]
    fn rejecting_an_approved_booking_revokes_it() {
        let mut v = venue();
        v.availability.add_slot(date("2025-06-01"), &"09:00-12:00".parse().unwrap());
        let b = booking(&v, "2025-06-01", "09:00-12:00", BookingStatus::Approved);
        let mut state = ReviewState::new(b, Some(v));

        run(&mut state, ReviewAction::Reject { reviewer: admin() });

        assert_eq!(state.outcome, Some(ReviewOutcome::Revoked));
        assert!(state.venue.unwrap().availability.is_empty());
    }

    #[test]
    fn revocation_keeps_maintenance() {
        let mut v = venue();
        v.availability.add_slot(date("2025-06-01"), &"09:00-12:00".parse().unwrap());
        v.status = VenueStatus::Maintenance;
        let b = booking(&v, "2025-06-01", "09:00-12:00", BookingStatus::Approved);
        let mut state = ReviewState::new(b, Some(v));

        run(&mut state, ReviewAction::Revoke { reviewer: admin() });

        assert_eq!(state.venue.unwrap().status, VenueStatus::Maintenance);
    }

    #[test]
    fn rejected_bookings_are_terminal() {
        let v = venue();
        for kind in [ReviewKind::Approve, ReviewKind::Reject, ReviewKind::Revoke] {
            let b = booking(&v, "2025-06-01", "09:00-12:00", BookingStatus::Rejected);
            let mut state = ReviewState::new(b, Some(v.clone()));
            let effects = run(&mut state, ReviewAction::new(kind, admin()));
            assert!(effects.is_empty());
            assert_eq!(
                state.outcome,
                Some(ReviewOutcome::Denied {
                    denial: ReviewDenial::InvalidTransition {
                        from: BookingStatus::Rejected,
                        action: kind,
                    }
                })
            );
        }
    }

    #[test]
    fn members_cannot_review() {
        let v = venue();
        let b = booking(&v, "2025-06-01", "09:00-12:00", BookingStatus::Pending);
        let mut state = ReviewState::new(b.clone(), Some(v));
        let member = Identity::new("user-2", "member@example.com", Role::User);

        let effects = run(&mut state, ReviewAction::Approve { reviewer: member });

        assert!(effects.is_empty());
        assert_eq!(state.booking, b);
        assert!(matches!(
            state.outcome,
            Some(ReviewOutcome::Denied {
                denial: ReviewDenial::Forbidden
            })
        ));
    }

    #[test]
    fn approval_without_venue_is_denied() {
        let v = venue();
        let b = booking(&v, "2025-06-01", "09:00-12:00", BookingStatus::Pending);
        let mut state = ReviewState::new(b, None);

        run(&mut state, ReviewAction::Approve { reviewer: admin() });

        let Some(ReviewOutcome::Denied { denial }) = state.outcome.clone() else {
            unreachable!("approval without a venue must be denied");
        };
        assert!(matches!(
            denial.into_error(&state.booking),
            BookingError::NotFound { entity: "venue", .. }
        ));
    }

    #[test]
    fn auto_rejection_notice_names_the_day() {
        let mut v = venue();
        v.availability.add_slot(date("2025-06-01"), &"09:00-12:00".parse().unwrap());
        let b = booking(&v, "2025-06-01", "09:00-12:00", BookingStatus::Pending);
        let mut state = ReviewState::new(b, Some(v));

        let effects = run(&mut state, ReviewAction::Approve { reviewer: admin() });

        assert!(effects.contains(&ReviewEffect::Notify {
            message: "Time slot 09:00-12:00 is already booked for Jun 01, 2025.".into(),
            severity: Severity::Error,
        }));

        let overlap = SlotConflict::Overlap {
            candidate: "11:00-13:00".parse().unwrap(),
            existing: "09:00-12:00".parse().unwrap(),
        };
        assert_eq!(
            auto_rejected_message(&overlap, date("2025-06-01")),
            "Time slot overlaps with existing booking for Jun 01, 2025."
        );
    }

    #[test]
    fn replayed_approval_lands_on_fresh_ledger() {
        let mut fresh = venue();
        fresh.availability.add_slot(date("2025-06-01"), &"14:00-16:00".parse().unwrap());
        fresh.version = Version::new(4);
        let b = booking(&fresh, "2025-06-01", "09:00-12:00", BookingStatus::Approved);

        let changed =
            ReviewReducer::replay_ledger(&ReviewOutcome::Approved, &b, &mut fresh, env().clock.now());

        assert_eq!(changed, Ok(true));
        assert_eq!(
            fresh.availability.slots_on(date("2025-06-01")),
            ["09:00-12:00", "14:00-16:00"]
        );
        assert_eq!(fresh.status, VenueStatus::Booked);
        assert_eq!(fresh.version, Version::new(4));
    }

    #[test]
    fn replayed_approval_reports_slot_taken_meanwhile() {
        let mut fresh = venue();
        fresh.availability.add_slot(date("2025-06-01"), &"10:00-11:00".parse().unwrap());
        let before = fresh.availability.clone();
        let b = booking(&fresh, "2025-06-01", "09:00-12:00", BookingStatus::Approved);

        let result =
            ReviewReducer::replay_ledger(&ReviewOutcome::Approved, &b, &mut fresh, env().clock.now());

        assert!(matches!(result, Err(SlotConflict::Overlap { .. })));
        assert_eq!(fresh.availability, before);
    }

    #[test]
    fn replayed_rejection_touches_nothing() {
        let mut fresh = venue();
        let before = fresh.clone();
        let b = booking(&fresh, "2025-06-01", "09:00-12:00", BookingStatus::Rejected);

        let changed =
            ReviewReducer::replay_ledger(&ReviewOutcome::Rejected, &b, &mut fresh, env().clock.now());

        assert_eq!(changed, Ok(false));
        assert_eq!(fresh, before);
    }
}
