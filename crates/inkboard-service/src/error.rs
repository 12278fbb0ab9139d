//! Service-layer error types.
//!
//! `ServiceError` is transport-agnostic. The HTTP crate maps it to status
//! codes and JSON error bodies.

/// Service error shared by every operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Input failed validation.
    #[error("{0}")]
    BadRequest(String),

    /// Email/password pair did not match any account.
    ///
    /// Deliberately carries no detail about which part was wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Missing or expired session.
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated, but not allowed to perform the operation.
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("{0}")]
    Conflict(String),

    /// Rate limit exceeded.
    #[error("{message}")]
    TooManyRequests {
        message: String,
        retry_after_seconds: Option<u64>,
    },

    /// Internal server error (data store failure, hashing failure, ...).
    #[error("internal error: {0}")]
    Internal(String),
}
