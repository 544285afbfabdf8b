//! # Venue Booking Runtime
//!
//! The I/O shell around `venue-booking-core`.
//!
//! [`BookingService`] loads venues and bookings through a
//! [`DocumentStore`](venue_booking_core::store::DocumentStore), runs the pure
//! domain logic, and executes the resulting writes and notices.
//!
//! ## Core Components
//!
//! - **`BookingService`**: submission, review, venue administration and reads
//! - **`VenueLocks`**: per-venue serialisation of reviews within one process
//! - **`RetryPolicy`**: bounded replay of reviews that lost a version race
//! - **`BookingMetrics`**: Prometheus counters and histograms
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use venue_booking_runtime::{BookingEnvironment, BookingService};
//!
//! let service = BookingService::new(BookingEnvironment::new(Arc::new(store)));
//! let report = service.approve(&admin, booking_id).await?;
//! println!("{}", report.outcome.label());
//! ```

/// Directory-backed attachment host
pub mod attachments;

/// Readiness reporting
pub mod health;

/// Per-venue async locks
pub mod locks;

/// Prometheus metrics for observability
pub mod metrics;

/// Log-backed notification sink
pub mod notifier;

/// Retry logic with exponential backoff
pub mod retry;

/// Booking service
pub mod service;

pub use attachments::DirectoryAttachmentHost;
pub use health::{HealthCheck, HealthStatus};
pub use locks::VenueLocks;
pub use metrics::{BookingMetrics, MetricsError, install_prometheus_recorder};
pub use notifier::TracingNotifier;
pub use retry::{RetryPolicy, retry_on_conflict};
pub use service::{
    BookingEnvironment, BookingService, ConsistencyMode, DEGRADED_MESSAGE, ReviewReport,
    ServiceSettings, VenueQuery,
};
