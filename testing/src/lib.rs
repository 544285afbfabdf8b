//! # Venue Booking Testing
//!
//! Testing utilities for the venue booking workspace.
//!
//! This crate provides:
//! - [`InMemoryDocumentStore`]: a document store with failure injection
//! - Mock implementations of the environment traits
//! - [`ReducerTest`]: Given-When-Then reducer tests
//! - Fixtures and proptest strategies for domain types
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use venue_booking_runtime::{BookingEnvironment, BookingService};
//! use venue_booking_testing::{fixtures, test_clock, InMemoryDocumentStore};
//!
//! #[tokio::test]
//! async fn approval_books_the_slot() {
//!     let store = InMemoryDocumentStore::new();
//!     let venue = fixtures::venue("Main Hall");
//!     let booking = fixtures::pending_booking(&venue, "2025-06-01", "09:00-12:00");
//!     store.seed_venue(venue.clone());
//!     store.seed_booking(booking.clone());
//!
//!     let env = BookingEnvironment::new(Arc::new(store.clone()))
//!         .with_clock(Arc::new(test_clock()));
//!     let service = BookingService::new(env);
//!     service.approve(&fixtures::admin(), booking.id).await.unwrap();
//! }
//! ```

pub mod fixtures;
pub mod memory_store;
pub mod mocks;

/// Property-based testing strategies.
pub mod properties {
    use proptest::prelude::*;
    use venue_booking_core::Slot;
    use venue_booking_core::slot::SlotTime;

    /// Slots between 06:00 and 22:00 on a 30-minute grid.
    pub fn slot_strategy() -> impl Strategy<Value = Slot> {
        (12u16..44, 1u16..=8).prop_filter_map("slot must end by 22:00", |(start, len)| {
            let end = start + len;
            if end > 44 {
                return None;
            }
            let start = SlotTime::from_minutes(start * 30).ok()?;
            let end = SlotTime::from_minutes(end * 30).ok()?;
            Slot::new(start, end).ok()
        })
    }
}

/// Install a test-friendly `tracing` subscriber once per process.
///
/// Honours `RUST_LOG`; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use memory_store::InMemoryDocumentStore;
pub use mocks::{FixedClock, RecordingNotifier, StubAttachmentHost, test_clock};
pub use reducer_test::{ReducerTest, ReviewTest};
