//! Venue endpoints.
//!
//! Reads are open to any caller; writes need an administrator identity.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use venue_booking_core::types::{NewVenue, VenuePatch};
use venue_booking_core::{Slot, Venue, VenueId};
use venue_booking_runtime::VenueQuery;

use crate::WebResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

/// Body of `PUT /api/venues/:id/maintenance`.
#[derive(Debug, Deserialize)]
pub struct MaintenanceRequest {
    /// `true` puts the venue under maintenance, `false` clears it.
    pub enabled: bool,
}

/// Query of `GET /api/venues/:id/free-slots`.
#[derive(Debug, Deserialize)]
pub struct FreeSlotsParams {
    /// Day to inspect, `YYYY-MM-DD`.
    pub date: NaiveDate,
}

/// Catalog slots still open on a date.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeSlotsResponse {
    /// Venue inspected.
    pub venue_id: VenueId,
    /// Day inspected.
    pub date: NaiveDate,
    /// Slots that would pass the conflict check.
    pub slots: Vec<Slot>,
}

/// Result of a bulk prune sweep.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// Venues rewritten by the sweep.
    pub refreshed: usize,
}

/// `GET /api/venues?name=`
///
/// # Errors
///
/// Returns 500 if the store cannot be read.
pub async fn list_venues(
    State(state): State<AppState>,
    Query(query): Query<VenueQuery>,
) -> WebResult<Json<Vec<Venue>>> {
    Ok(Json(state.service().list_venues(&query).await?))
}

/// `GET /api/venues/:id`
///
/// # Errors
///
/// Returns 404 if the venue does not exist.
pub async fn get_venue(
    State(state): State<AppState>,
    Path(venue_id): Path<VenueId>,
) -> WebResult<Json<Venue>> {
    Ok(Json(state.service().get_venue(venue_id).await?))
}

/// `POST /api/venues`
///
/// # Errors
///
/// Returns 403 for non-administrators and 422 for invalid venues.
pub async fn create_venue(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(new_venue): Json<NewVenue>,
) -> WebResult<(StatusCode, Json<Venue>)> {
    let venue = state.service().create_venue(&identity, new_venue).await?;
    Ok((StatusCode::CREATED, Json(venue)))
}

/// `PATCH /api/venues/:id`
///
/// # Errors
///
/// Returns 403, 404 or 422 as the service decides.
pub async fn update_venue(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(venue_id): Path<VenueId>,
    Json(patch): Json<VenuePatch>,
) -> WebResult<Json<Venue>> {
    Ok(Json(
        state
            .service()
            .update_venue(&identity, venue_id, &patch)
            .await?,
    ))
}

/// `DELETE /api/venues/:id`
///
/// # Errors
///
/// Returns 403 for non-administrators and 404 if the venue does not exist.
pub async fn delete_venue(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(venue_id): Path<VenueId>,
) -> WebResult<StatusCode> {
    state.service().delete_venue(&identity, venue_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/venues/:id/maintenance`
///
/// # Errors
///
/// Returns 403 for non-administrators and 404 if the venue does not exist.
pub async fn set_maintenance(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(venue_id): Path<VenueId>,
    Json(request): Json<MaintenanceRequest>,
) -> WebResult<Json<Venue>> {
    Ok(Json(
        state
            .service()
            .set_maintenance(&identity, venue_id, request.enabled)
            .await?,
    ))
}

/// `GET /api/venues/:id/free-slots?date=`
///
/// # Errors
///
/// Returns 404 if the venue does not exist.
pub async fn free_slots(
    State(state): State<AppState>,
    Path(venue_id): Path<VenueId>,
    Query(params): Query<FreeSlotsParams>,
) -> WebResult<Json<FreeSlotsResponse>> {
    let slots = state.service().free_slots(venue_id, params.date).await?;
    Ok(Json(FreeSlotsResponse {
        venue_id,
        date: params.date,
        slots,
    }))
}

/// `POST /api/venues/refresh`
///
/// # Errors
///
/// Returns 403 for non-administrators.
pub async fn refresh_venues(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> WebResult<Json<RefreshResponse>> {
    let refreshed = state.service().refresh_all_venues(&identity).await?;
    Ok(Json(RefreshResponse { refreshed }))
}
