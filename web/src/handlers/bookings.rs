//! Booking endpoints.
//!
//! An approval that hits a slot conflict is not an HTTP error: the response
//! is 200 with `"outcome": "auto_rejected"` and the conflict.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use venue_booking_core::stats::DashboardStats;
use venue_booking_core::store::BookingQuery;
use venue_booking_core::submission::SubmitBooking;
use venue_booking_core::{Booking, BookingId};
use venue_booking_runtime::ReviewReport;

use crate::WebResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

/// `POST /api/bookings`
///
/// Creates one pending booking per requested slot.
///
/// # Errors
///
/// Returns 422 for invalid requests, 404 for unknown venues and 409 when a
/// slot is visibly taken.
pub async fn submit_booking(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(request): Json<SubmitBooking>,
) -> WebResult<(StatusCode, Json<Vec<Booking>>)> {
    let bookings = state.service().submit(&identity, request).await?;
    Ok((StatusCode::CREATED, Json(bookings)))
}

/// `GET /api/bookings?status=&user_id=&venue_id=`
///
/// # Errors
///
/// Returns 403 for non-administrators.
pub async fn list_bookings(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Query(query): Query<BookingQuery>,
) -> WebResult<Json<Vec<Booking>>> {
    Ok(Json(state.service().list_bookings(&identity, query).await?))
}

/// `GET /api/bookings/mine`
///
/// # Errors
///
/// Returns 500 if the store cannot be read.
pub async fn my_bookings(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> WebResult<Json<Vec<Booking>>> {
    Ok(Json(state.service().my_bookings(&identity).await?))
}

/// `GET /api/bookings/:id`
///
/// # Errors
///
/// Returns 404 if the booking does not exist and 403 unless the caller owns
/// it or is an administrator.
pub async fn get_booking(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(booking_id): Path<BookingId>,
) -> WebResult<Json<Booking>> {
    Ok(Json(
        state.service().get_booking(&identity, booking_id).await?,
    ))
}

/// `POST /api/bookings/:id/approve`
///
/// # Errors
///
/// Returns 403, 404 or 409 as the review decides.
pub async fn approve_booking(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(booking_id): Path<BookingId>,
) -> WebResult<Json<ReviewReport>> {
    Ok(Json(state.service().approve(&identity, booking_id).await?))
}

/// `POST /api/bookings/:id/reject`
///
/// # Errors
///
/// Returns 403, 404 or 409 as the review decides.
pub async fn reject_booking(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(booking_id): Path<BookingId>,
) -> WebResult<Json<ReviewReport>> {
    Ok(Json(state.service().reject(&identity, booking_id).await?))
}

/// `POST /api/bookings/:id/revoke`
///
/// # Errors
///
/// Returns 403, 404 or 409 as the review decides.
pub async fn revoke_booking(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(booking_id): Path<BookingId>,
) -> WebResult<Json<ReviewReport>> {
    Ok(Json(state.service().revoke(&identity, booking_id).await?))
}

/// `GET /api/dashboard`
///
/// # Errors
///
/// Returns 403 for non-administrators.
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> WebResult<Json<DashboardStats>> {
    Ok(Json(state.service().dashboard(&identity).await?))
}
