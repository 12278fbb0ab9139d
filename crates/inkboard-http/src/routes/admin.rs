//! Admin overrides for the comment rate limiter.
//!
//! All endpoints require a signed-in admin: 401 without a session, 403 for a
//! non-admin session.

use axum::extract::{Json, Path, State};
use inkboard_service::error::ServiceError;
use inkboard_service::rate_limit::{RateLimitPolicy, RateLimitStatus};
use inkboard_service::types::normalize_email;

use crate::error::{ApiError, ErrorBody};
use crate::extract::Authenticated;
use crate::state::AppState;
use crate::types::{RateLimitResetResponse, RateLimitStatusResponse};

fn require_admin(auth: &Authenticated) -> Result<(), ApiError> {
    if auth.session.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Admin access required".to_owned()).into())
    }
}

fn status_response(
    key: String,
    status: Option<RateLimitStatus>,
    policy: RateLimitPolicy,
) -> RateLimitStatusResponse {
    match status {
        Some(s) => RateLimitStatusResponse {
            key,
            active: true,
            count: s.count,
            limit: s.limit,
            reset_time: Some(s.reset_time),
        },
        None => RateLimitStatusResponse {
            key,
            active: false,
            count: 0,
            limit: policy.max_requests,
            reset_time: None,
        },
    }
}

/// Current comment counter for a client IP.
#[utoipa::path(
    get,
    path = "/api/admin/rate-limits/ip/{ip}",
    params(("ip" = String, Path, description = "Client IP address")),
    responses(
        (status = 200, description = "Counter state", body = RateLimitStatusResponse),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
    ),
    tag = "Admin"
)]
pub async fn ip_status(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(ip): Path<String>,
) -> Result<Json<RateLimitStatusResponse>, ApiError> {
    require_admin(&auth)?;
    let ip = ip.trim().to_owned();
    let status = state.rate_limiter().ip_rate_limit_status(&ip);
    Ok(Json(status_response(ip, status, RateLimitPolicy::IP)))
}

/// Restore the full comment quota for a client IP.
#[utoipa::path(
    delete,
    path = "/api/admin/rate-limits/ip/{ip}",
    params(("ip" = String, Path, description = "Client IP address")),
    responses(
        (status = 200, description = "Counter cleared", body = RateLimitResetResponse),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
    ),
    tag = "Admin"
)]
pub async fn reset_ip(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(ip): Path<String>,
) -> Result<Json<RateLimitResetResponse>, ApiError> {
    require_admin(&auth)?;
    let ip = ip.trim().to_owned();
    state.rate_limiter().reset_ip_rate_limit(&ip);
    tracing::info!(%ip, admin_id = %auth.session.account_id, "IP rate limit reset");
    Ok(Json(RateLimitResetResponse {
        key: ip,
        reset: true,
    }))
}

/// Current comment counter for an author email.
#[utoipa::path(
    get,
    path = "/api/admin/rate-limits/email/{email}",
    params(("email" = String, Path, description = "Author email (case-insensitive)")),
    responses(
        (status = 200, description = "Counter state", body = RateLimitStatusResponse),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
    ),
    tag = "Admin"
)]
pub async fn email_status(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(email): Path<String>,
) -> Result<Json<RateLimitStatusResponse>, ApiError> {
    require_admin(&auth)?;
    let email = normalize_email(&email);
    let status = state.rate_limiter().email_rate_limit_status(&email);
    Ok(Json(status_response(email, status, RateLimitPolicy::EMAIL)))
}

/// Restore the full comment quota for an author email.
#[utoipa::path(
    delete,
    path = "/api/admin/rate-limits/email/{email}",
    params(("email" = String, Path, description = "Author email (case-insensitive)")),
    responses(
        (status = 200, description = "Counter cleared", body = RateLimitResetResponse),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
    ),
    tag = "Admin"
)]
pub async fn reset_email(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(email): Path<String>,
) -> Result<Json<RateLimitResetResponse>, ApiError> {
    require_admin(&auth)?;
    let email = normalize_email(&email);
    state.rate_limiter().reset_email_rate_limit(&email);
    tracing::info!(admin_id = %auth.session.account_id, "email rate limit reset");
    Ok(Json(RateLimitResetResponse {
        key: email,
        reset: true,
    }))
}
