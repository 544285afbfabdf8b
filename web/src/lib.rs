//! Axum HTTP API for venue booking.
//!
//! This crate is the imperative shell around
//! [`BookingService`](venue_booking_runtime::BookingService): it parses
//! requests, establishes the caller's identity from upstream headers, calls
//! the service and maps [`BookingError`](venue_booking_core::BookingError)
//! to HTTP responses.
//!
//! # Request Flow
//!
//! 1. **Request id** assigned or propagated ([`middleware`])
//! 2. **Identity** extracted from `X-User-*` headers ([`extractors`])
//! 3. **Service call** performs the operation
//! 4. **Result** serialized as JSON, errors as `{ code, message }`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use venue_booking_runtime::{BookingEnvironment, BookingService};
//! use venue_booking_web::{AppState, router};
//!
//! let service = Arc::new(BookingService::new(BookingEnvironment::new(store)));
//! let app = router(AppState::new(service));
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::CurrentUser;
pub use middleware::{REQUEST_ID_HEADER, RequestId, request_id_layer};
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// Build the full HTTP router.
///
/// CORS is permissive: identity comes from headers set by the upstream
/// identity provider, not from browser credentials.
pub fn router(state: AppState) -> Router {
    use handlers::{bookings, changes, health, venues};

    let api = Router::new()
        .route("/venues", get(venues::list_venues).post(venues::create_venue))
        .route("/venues/refresh", post(venues::refresh_venues))
        .route(
            "/venues/:id",
            get(venues::get_venue)
                .patch(venues::update_venue)
                .delete(venues::delete_venue),
        )
        .route("/venues/:id/maintenance", put(venues::set_maintenance))
        .route("/venues/:id/free-slots", get(venues::free_slots))
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::submit_booking),
        )
        .route("/bookings/mine", get(bookings::my_bookings))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/approve", post(bookings::approve_booking))
        .route("/bookings/:id/reject", post(bookings::reject_booking))
        .route("/bookings/:id/revoke", post(bookings::revoke_booking))
        .route("/dashboard", get(bookings::dashboard))
        .route("/changes", get(changes::subscribe));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .route("/metrics", get(health::metrics))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(middleware::request_span))
        .layer(request_id_layer())
        .with_state(state)
}
