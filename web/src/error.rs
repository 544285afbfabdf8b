//! Error types for web handlers.
//!
//! [`AppError`] bridges [`BookingError`] and HTTP responses, implementing
//! Axum's `IntoResponse` trait. Every error body is `{ "code", "message" }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use venue_booking_core::BookingError;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<Venue>, AppError> {
///     let venue = state.service().get_venue(id).await?;
///     Ok(Json(venue))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message.into(), "FORBIDDEN".to_string())
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 409 Conflict error with a specific code.
    #[must_use]
    pub fn conflict(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), code.to_string())
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match &err {
            BookingError::NotFound { entity, id } => Self::not_found(entity, id),
            BookingError::Validation(message) => Self::validation(message.clone()),
            BookingError::Forbidden(message) => Self::forbidden(message.clone()),
            BookingError::SlotUnavailable(_) => Self::conflict("SLOT_UNAVAILABLE", err.to_string()),
            BookingError::InvalidTransition { .. } => {
                Self::conflict("INVALID_TRANSITION", err.to_string())
            }
            BookingError::Conflict { .. } | BookingError::StaleBooking { .. } => {
                Self::conflict("CONFLICT", err.to_string())
            }
            BookingError::PersistenceFailure(_) => {
                Self::internal("An internal error occurred")
                    .with_source(anyhow::Error::new(err.clone()))
            }
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use venue_booking_core::review::ReviewKind;
    use venue_booking_core::{BookingId, BookingStatus, VenueId, Version};

    #[test]
    fn test_error_display() {
        let err = AppError::validation("Purpose is required");
        assert_eq!(err.to_string(), "[VALIDATION_ERROR] Purpose is required");
    }

    #[test]
    fn test_booking_errors_map_to_statuses() {
        let cases = [
            (BookingError::venue_not_found(VenueId::new()), StatusCode::NOT_FOUND),
            (BookingError::Validation("bad".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (BookingError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (
                BookingError::InvalidTransition {
                    from: BookingStatus::Rejected,
                    action: ReviewKind::Approve,
                },
                StatusCode::CONFLICT,
            ),
            (
                BookingError::Conflict {
                    venue_id: VenueId::new(),
                    expected: Version::new(1),
                    actual: Version::new(2),
                },
                StatusCode::CONFLICT,
            ),
            (
                BookingError::StaleBooking {
                    booking_id: BookingId::new(),
                    expected: BookingStatus::Pending,
                    actual: BookingStatus::Approved,
                },
                StatusCode::CONFLICT,
            ),
            (
                BookingError::PersistenceFailure("disk full".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_persistence_details_are_not_exposed() {
        let err = AppError::from(BookingError::PersistenceFailure("password=hunter2".into()));
        assert!(!err.to_string().contains("hunter2"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_invalid_transition_code() {
        let err = AppError::from(BookingError::InvalidTransition {
            from: BookingStatus::Approved,
            action: ReviewKind::Approve,
        });
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }
}
