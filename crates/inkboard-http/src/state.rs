//! HTTP application state: wraps `ServiceState` with HTTP-specific fields.
//!
//! `AppState` provides transparent access to all `ServiceState` methods
//! via `Deref`, and adds transport-specific config like CORS origins and
//! cookie flags.

use std::ops::Deref;
use std::sync::Arc;

use inkboard_service::ServiceState;

/// Shared HTTP application state, cloneable across handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppInner>,
}

struct AppInner {
    service: ServiceState,
    cors_origins: Vec<String>,
    secure_cookies: bool,
}

impl Deref for AppState {
    type Target = ServiceState;

    fn deref(&self) -> &ServiceState {
        &self.inner.service
    }
}

impl AppState {
    /// Creates a new HTTP application state.
    pub fn new(service: ServiceState, cors_origins: Vec<String>, secure_cookies: bool) -> Self {
        Self {
            inner: Arc::new(AppInner {
                service,
                cors_origins,
                secure_cookies,
            }),
        }
    }

    /// Creates an in-memory application state (for tests and ephemeral use).
    pub fn new_in_memory(session_ttl: u64) -> Self {
        Self::new(ServiceState::new_in_memory(session_ttl), vec![], false)
    }

    /// Returns the configured CORS allowed origins.
    pub fn cors_origins(&self) -> &[String] {
        &self.inner.cors_origins
    }

    /// Whether session cookies carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.inner.secure_cookies
    }

    /// Returns a reference to the underlying service state.
    pub fn service(&self) -> &ServiceState {
        &self.inner.service
    }
}
