//! Comment-submission rate limiting with fixed-window counters.
//!
//! Two independent windows are kept: one keyed by client IP and one keyed by
//! normalized email. A submission must pass both. Counter storage sits behind
//! [`RateLimitStore`] so a shared backend can stand in for the in-memory map
//! when several server instances need to agree on counts.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

use crate::types::normalize_email;

/// Window and quota for one counter family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_requests: u32,
}

impl RateLimitPolicy {
    /// 5 submissions per IP every 15 minutes.
    pub const IP: Self = Self {
        window: Duration::from_secs(15 * 60),
        max_requests: 5,
    };

    /// 3 submissions per email every hour.
    pub const EMAIL: Self = Self {
        window: Duration::from_secs(60 * 60),
        max_requests: 3,
    };

    fn window_ms(self) -> i64 {
        self.window.as_millis() as i64
    }
}

/// Counter for one key. `count >= 1` while the entry is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    /// Epoch milliseconds at which the window closes.
    pub reset_time: i64,
}

impl RateLimitEntry {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.reset_time
    }
}

/// Outcome of recording one request against a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    /// Counted; the entry after the update.
    Admitted(RateLimitEntry),
    /// Quota used up; the entry is left untouched.
    Exhausted(RateLimitEntry),
}

/// Storage for rate-limit counters.
///
/// `hit` must perform its read-modify-write as one atomic step per key.
pub trait RateLimitStore: Send + Sync {
    /// Records a request for `key`.
    ///
    /// An absent or expired entry restarts at `count = 1` with a fresh
    /// window; a live entry at `max_requests` is exhausted; anything else is
    /// incremented.
    fn hit(&self, key: &str, now_ms: i64, policy: RateLimitPolicy) -> Hit;

    /// Returns the raw entry, expired or not.
    fn get(&self, key: &str) -> Option<RateLimitEntry>;

    fn remove(&self, key: &str);

    /// Drops every expired entry. Returns the count removed.
    fn sweep(&self, now_ms: i64) -> usize;
}

/// Process-local counter store backed by a concurrent map.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    counters: DashMap<String, RateLimitEntry>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    fn hit(&self, key: &str, now_ms: i64, policy: RateLimitPolicy) -> Hit {
        // A fresh placeholder has reset_time == now, so it reads as expired.
        let mut slot = self.counters.entry(key.to_owned()).or_insert(RateLimitEntry {
            count: 0,
            reset_time: now_ms,
        });
        let entry = slot.value_mut();

        if entry.is_expired(now_ms) {
            *entry = RateLimitEntry {
                count: 1,
                reset_time: now_ms + policy.window_ms(),
            };
            Hit::Admitted(*entry)
        } else if entry.count >= policy.max_requests {
            Hit::Exhausted(*entry)
        } else {
            entry.count += 1;
            Hit::Admitted(*entry)
        }
    }

    fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.counters.get(key).map(|e| *e.value())
    }

    fn remove(&self, key: &str) {
        self.counters.remove(key);
    }

    fn sweep(&self, now_ms: i64) -> usize {
        let mut removed = 0;
        self.counters.retain(|_, entry| {
            let expired = entry.is_expired(now_ms);
            if expired {
                removed += 1;
            }
            !expired
        });
        removed
    }
}

/// Result of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

impl RateLimitDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            error: None,
            retry_after_seconds: None,
        }
    }

    fn invalid(message: &str) -> Self {
        Self {
            allowed: false,
            error: Some(message.to_owned()),
            retry_after_seconds: None,
        }
    }

    fn exhausted(retry_after_seconds: u64) -> Self {
        let minutes = retry_after_seconds.div_ceil(60).max(1);
        let unit = if minutes == 1 { "minute" } else { "minutes" };
        Self {
            allowed: false,
            error: Some(format!(
                "Too many comments submitted. Please try again in {minutes} {unit}."
            )),
            retry_after_seconds: Some(retry_after_seconds),
        }
    }
}

/// Read-only view of a live counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub count: u32,
    pub limit: u32,
    /// Epoch milliseconds at which the window closes.
    pub reset_time: i64,
}

/// Per-IP and per-email rate limiter for comment submission.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    ip_store: Arc<dyn RateLimitStore>,
    email_store: Arc<dyn RateLimitStore>,
    ip_policy: RateLimitPolicy,
    email_policy: RateLimitPolicy,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Creates a limiter with in-memory stores and the standard policies.
    pub fn new() -> Self {
        Self::with_stores(
            Arc::new(MemoryRateLimitStore::new()),
            Arc::new(MemoryRateLimitStore::new()),
        )
    }

    /// Creates a limiter over caller-supplied stores.
    pub fn with_stores(
        ip_store: Arc<dyn RateLimitStore>,
        email_store: Arc<dyn RateLimitStore>,
    ) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                ip_store,
                email_store,
                ip_policy: RateLimitPolicy::IP,
                email_policy: RateLimitPolicy::EMAIL,
            }),
        }
    }

    pub fn check_ip_rate_limit(&self, ip: &str) -> RateLimitDecision {
        self.check_ip_rate_limit_at(ip, now_ms())
    }

    pub fn check_ip_rate_limit_at(&self, ip: &str, now_ms: i64) -> RateLimitDecision {
        let ip = ip.trim();
        if ip.is_empty() {
            return RateLimitDecision::invalid("Unable to verify request origin.");
        }
        let inner = &self.inner;
        let decision = admit(inner.ip_store.as_ref(), inner.ip_policy, ip, now_ms);
        if !decision.allowed {
            tracing::info!(%ip, retry_after = ?decision.retry_after_seconds, "IP rate limit exceeded");
        }
        decision
    }

    pub fn check_email_rate_limit(&self, email: &str) -> RateLimitDecision {
        self.check_email_rate_limit_at(email, now_ms())
    }

    pub fn check_email_rate_limit_at(&self, email: &str, now_ms: i64) -> RateLimitDecision {
        let key = normalize_email(email);
        if key.is_empty() {
            return RateLimitDecision::invalid("A valid email address is required.");
        }
        let inner = &self.inner;
        let decision = admit(inner.email_store.as_ref(), inner.email_policy, &key, now_ms);
        if !decision.allowed {
            tracing::info!(retry_after = ?decision.retry_after_seconds, "email rate limit exceeded");
        }
        decision
    }

    /// Checks the IP window, then the email window.
    ///
    /// An IP rejection returns immediately and leaves the email counter
    /// untouched.
    pub fn check_rate_limit(&self, ip: &str, email: &str) -> RateLimitDecision {
        self.check_rate_limit_at(ip, email, now_ms())
    }

    pub fn check_rate_limit_at(&self, ip: &str, email: &str, now_ms: i64) -> RateLimitDecision {
        let by_ip = self.check_ip_rate_limit_at(ip, now_ms);
        if !by_ip.allowed {
            return by_ip;
        }
        self.check_email_rate_limit_at(email, now_ms)
    }

    pub fn reset_ip_rate_limit(&self, ip: &str) {
        self.inner.ip_store.remove(ip.trim());
    }

    pub fn reset_email_rate_limit(&self, email: &str) {
        self.inner.email_store.remove(&normalize_email(email));
    }

    pub fn ip_rate_limit_status(&self, ip: &str) -> Option<RateLimitStatus> {
        self.ip_rate_limit_status_at(ip, now_ms())
    }

    pub fn ip_rate_limit_status_at(&self, ip: &str, now_ms: i64) -> Option<RateLimitStatus> {
        status(
            self.inner.ip_store.as_ref(),
            self.inner.ip_policy,
            ip.trim(),
            now_ms,
        )
    }

    pub fn email_rate_limit_status(&self, email: &str) -> Option<RateLimitStatus> {
        self.email_rate_limit_status_at(email, now_ms())
    }

    pub fn email_rate_limit_status_at(&self, email: &str, now_ms: i64) -> Option<RateLimitStatus> {
        status(
            self.inner.email_store.as_ref(),
            self.inner.email_policy,
            &normalize_email(email),
            now_ms,
        )
    }
}

fn admit(
    store: &dyn RateLimitStore,
    policy: RateLimitPolicy,
    key: &str,
    now_ms: i64,
) -> RateLimitDecision {
    store.sweep(now_ms);
    match store.hit(key, now_ms, policy) {
        Hit::Admitted(_) => RateLimitDecision::allow(),
        Hit::Exhausted(entry) => {
            let remaining_ms = (entry.reset_time - now_ms).max(0) as u64;
            RateLimitDecision::exhausted(remaining_ms.div_ceil(1000))
        }
    }
}

fn status(
    store: &dyn RateLimitStore,
    policy: RateLimitPolicy,
    key: &str,
    now_ms: i64,
) -> Option<RateLimitStatus> {
    store
        .get(key)
        .filter(|entry| !entry.is_expired(now_ms))
        .map(|entry| RateLimitStatus {
            count: entry.count,
            limit: policy.max_requests,
            reset_time: entry.reset_time,
        })
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
