//! Custom Axum extractors.
//!
//! Identity is established by an upstream identity provider and forwarded in
//! three headers:
//!
//! - `X-User-Id`: opaque user id (required)
//! - `X-User-Email`: email used for audit fields (required)
//! - `X-User-Role`: `user`, `admin` or `superadmin` (defaults to `user`)
//!
//! # Examples
//!
//! ```ignore
//! use venue_booking_web::extractors::CurrentUser;
//!
//! async fn handler(CurrentUser(identity): CurrentUser) -> String {
//!     format!("Hello {}", identity.email)
//! }
//! ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use venue_booking_core::{Identity, Role};

use crate::error::AppError;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the caller's email.
pub const USER_EMAIL_HEADER: &str = "X-User-Email";

/// Header carrying the caller's role.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// The authenticated caller.
///
/// Rejects the request with 401 when the id or email header is missing or
/// the role is unknown.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_headers(&parts.headers).map(Self)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Build an [`Identity`] from the identity headers.
///
/// # Errors
///
/// Returns a 401 [`AppError`] if `X-User-Id` or `X-User-Email` is missing,
/// or `X-User-Role` is not a known role.
pub fn identity_from_headers(headers: &HeaderMap) -> Result<Identity, AppError> {
    let user_id = header(headers, USER_ID_HEADER)
        .ok_or_else(|| AppError::unauthorized(format!("Missing {USER_ID_HEADER} header")))?;
    let email = header(headers, USER_EMAIL_HEADER)
        .ok_or_else(|| AppError::unauthorized(format!("Missing {USER_EMAIL_HEADER} header")))?;
    let role = match header(headers, USER_ROLE_HEADER) {
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|e| AppError::unauthorized(e.to_string()))?,
        None => Role::User,
    };

    Ok(Identity::new(user_id, email, role))
}
