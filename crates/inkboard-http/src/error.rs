//! HTTP error type and JSON error bodies.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use inkboard_service::error::ServiceError;
use serde::Serialize;
use utoipa::ToSchema;

/// Error returned by every handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Request body could not be parsed.
    #[error("{0}")]
    InvalidBody(String),
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    /// Error code (e.g. "bad_request", "invalid_credentials", "too_many_requests").
    pub(crate) error: String,
    /// Human-readable error detail, if available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) detail: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut retry_after = None;
        let (status, error, detail) = match self {
            ApiError::InvalidBody(msg) => (StatusCode::BAD_REQUEST, "bad_request", Some(msg)),
            ApiError::Service(err) => match err {
                ServiceError::BadRequest(msg) => {
                    (StatusCode::BAD_REQUEST, "bad_request", Some(msg))
                }
                ServiceError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "invalid_credentials",
                    Some("Invalid credentials".to_owned()),
                ),
                ServiceError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
                ServiceError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg)),
                ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg)),
                ServiceError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg)),
                ServiceError::TooManyRequests {
                    message,
                    retry_after_seconds,
                } => {
                    retry_after = retry_after_seconds;
                    (
                        StatusCode::TOO_MANY_REQUESTS,
                        "too_many_requests",
                        Some(message),
                    )
                }
                ServiceError::Internal(msg) => {
                    tracing::error!(%msg, "internal server error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        Some("An unexpected error occurred".to_owned()),
                    )
                }
            },
        };

        let body = ErrorBody {
            error: error.to_owned(),
            detail,
        };
        let mut response = (status, axum::Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}
