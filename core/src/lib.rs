//! # Venue Booking Core
//!
//! Pure domain logic for the venue booking system.
//!
//! The crate decides whether a requested time slot may be granted, mutates a
//! venue's availability ledger, keeps the venue status consistent with it,
//! and purges past-dated entries. Nothing here performs I/O: storage, time,
//! file hosting and notifications are reached through the traits in
//! [`store`] and [`environment`].
//!
//! ## Building blocks
//!
//! - [`slot`]: `HH:MM-HH:MM` intervals backed by minute-of-day integers
//! - [`ledger`]: per-venue date → slots map with prune/add/remove
//! - [`conflict`]: duplicate and half-open overlap detection
//! - [`status`]: venue status derivation with sticky maintenance
//! - [`review`]: the approve/reject/revoke state machine as a [`reducer::Reducer`]
//! - [`submission`]: validation and expansion of booking requests
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use venue_booking_core::ledger::AvailabilityLedger;
//! use venue_booking_core::slot::Slot;
//!
//! let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
//! let morning: Slot = "09:00-12:00".parse().unwrap();
//!
//! let mut ledger = AvailabilityLedger::new();
//! assert!(ledger.check(day, &morning).is_ok());
//! ledger.add_slot(day, &morning);
//! assert!(ledger.check(day, &morning).is_err());
//! ```

pub mod conflict;
pub mod environment;
pub mod error;
pub mod ledger;
pub mod review;
pub mod slot;
pub mod stats;
pub mod status;
pub mod store;
pub mod submission;
pub mod types;

/// Reducer abstraction.
pub mod reducer {
    use smallvec::SmallVec;

    /// A pure state transition: `(State, Action, Environment) → (State, Effects)`.
    ///
    /// `reduce` updates the state in place and describes the side effects to
    /// perform as values. Executing them is the runtime's job, which keeps
    /// implementations testable without storage.
    pub trait Reducer {
        /// State the reducer operates on.
        type State;

        /// Input processed by the reducer.
        type Action;

        /// Injected dependencies.
        type Environment;

        /// Side-effect descriptions produced by the reducer.
        type Effect;

        /// Apply `action` to `state`, returning the effects to execute.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Self::Effect; 4]>;
    }
}

pub use conflict::SlotConflict;
pub use error::BookingError;
pub use ledger::AvailabilityLedger;
pub use slot::{Slot, SlotCatalog, SlotTime};
pub use types::{
    Booking, BookingId, BookingStatus, Identity, Role, UserId, Venue, VenueId, VenueStatus,
    Version,
};
