//! Inkboard Service: core business logic for the Inkboard server.
//!
//! This crate contains all transport-agnostic logic: comment rate limiting,
//! cross-collection identity resolution, sign-in/sign-up, sign-in sessions,
//! comment intake, metrics, and the repository interfaces over the account
//! and content collections.
//!
//! The `inkboard-http` crate depends on this one and provides the axum
//! adapter. **No transport dependencies** live here.

pub mod auth;
pub mod comments;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod password;
pub mod rate_limit;
pub mod seed;
pub mod session;
pub mod store;
pub mod types;

use std::sync::Arc;
use std::time::Instant;

use metrics::Metrics;
use rate_limit::RateLimiter;
use session::{AuthSession, AuthSessionRegistry};
use store::{AccountRepository, ContentRepository, MemoryStore};

/// Configuration subset relevant to the service layer.
///
/// Transport-specific config (ports, CORS origins, cookie flags) stays in
/// the binary crate's `Config` struct.
pub struct ServiceConfig {
    /// Sign-in session inactivity timeout in seconds.
    pub session_ttl: u64,
}

/// Shared service state, cloneable across all handlers.
#[derive(Clone)]
pub struct ServiceState {
    inner: Arc<Inner>,
}

struct Inner {
    accounts: Arc<dyn AccountRepository>,
    content: Arc<dyn ContentRepository>,
    rate_limiter: RateLimiter,
    sessions: AuthSessionRegistry,
    metrics: Metrics,
    session_ttl: u64,
    start_time: Instant,
}

impl ServiceState {
    /// Creates a service state backed by the in-memory store.
    pub fn new(config: &ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_repositories(config, store.clone(), store)
    }

    /// Creates a service state over caller-supplied repositories.
    pub fn with_repositories(
        config: &ServiceConfig,
        accounts: Arc<dyn AccountRepository>,
        content: Arc<dyn ContentRepository>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                accounts,
                content,
                rate_limiter: RateLimiter::new(),
                sessions: AuthSessionRegistry::new(),
                metrics: Metrics::new(),
                session_ttl: config.session_ttl,
                start_time: Instant::now(),
            }),
        }
    }

    /// Creates an in-memory service state (for tests and ephemeral use).
    pub fn new_in_memory(session_ttl: u64) -> Self {
        Self::new(&ServiceConfig { session_ttl })
    }

    // --- Accessors ---

    pub fn accounts(&self) -> &dyn AccountRepository {
        self.inner.accounts.as_ref()
    }

    pub fn content(&self) -> &dyn ContentRepository {
        self.inner.content.as_ref()
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.rate_limiter
    }

    pub fn sessions(&self) -> &AuthSessionRegistry {
        &self.inner.sessions
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    pub fn session_ttl(&self) -> u64 {
        self.inner.session_ttl
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    /// Looks up a live session by token.
    pub fn authenticate(&self, token: &str) -> Option<AuthSession> {
        self.inner.sessions.get(token, self.inner.session_ttl)
    }

    // --- Maintenance ---

    /// Clean up expired sessions. Returns count removed.
    pub fn cleanup_expired_sessions(&self) -> usize {
        self.inner.sessions.cleanup_expired(self.inner.session_ttl)
    }
}
