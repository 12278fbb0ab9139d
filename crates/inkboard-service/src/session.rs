//! Sign-in session registry with inactivity-based expiry.
//!
//! Maps opaque random tokens to the authenticated principal. Tokens are
//! handed to clients as a cookie (or used as a bearer token).

use std::time::Instant;

use dashmap::DashMap;

use crate::types::Collection;

/// An authenticated principal bound to a session token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub account_id: String,
    pub collection: Collection,
    /// When the session was created.
    pub created_at: Instant,
    /// Last time the session was used.
    last_used: Instant,
}

impl AuthSession {
    pub fn is_admin(&self) -> bool {
        self.collection == Collection::Admins
    }
}

/// Thread-safe registry of live sign-in sessions.
pub struct AuthSessionRegistry {
    sessions: DashMap<String, AuthSession>,
}

impl Default for AuthSessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthSessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Registers a session and returns its 64-character hex token.
    pub fn create(&self, account_id: &str, collection: Collection) -> String {
        let token = hex::encode(rand::random::<[u8; 32]>());
        let now = Instant::now();
        self.sessions.insert(
            token.clone(),
            AuthSession {
                account_id: account_id.to_owned(),
                collection,
                created_at: now,
                last_used: now,
            },
        );
        token
    }

    /// Returns the session if it exists and has been used within `ttl_secs`.
    /// Touches the session on success; evicts it when expired.
    pub fn get(&self, token: &str, ttl_secs: u64) -> Option<AuthSession> {
        let mut entry = self.sessions.get_mut(token)?;
        if entry.last_used.elapsed().as_secs() > ttl_secs {
            drop(entry); // release the shard lock before removing
            self.sessions.remove(token);
            return None;
        }
        entry.last_used = Instant::now();
        Some(entry.value().clone())
    }

    pub fn remove(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Removes all expired sessions. Returns the count removed.
    pub fn cleanup_expired(&self, ttl_secs: u64) -> usize {
        // Counted inside `retain`: sessions created meanwhile must not skew it.
        let mut removed = 0;
        self.sessions.retain(|_, s| {
            let live = s.last_used.elapsed().as_secs() <= ttl_secs;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let registry = AuthSessionRegistry::new();
        let token = registry.create("acct-1", Collection::Admins);
        assert_eq!(token.len(), 64);

        let session = registry.get(&token, 60).unwrap();
        assert_eq!(session.account_id, "acct-1");
        assert!(session.is_admin());
        assert!(registry.get("missing", 60).is_none());
    }

    #[test]
    fn test_tokens_are_unique() {
        let registry = AuthSessionRegistry::new();
        let a = registry.create("acct-1", Collection::Users);
        let b = registry.create("acct-1", Collection::Users);
        assert_ne!(a, b);
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn test_remove() {
        let registry = AuthSessionRegistry::new();
        let token = registry.create("acct-1", Collection::Users);
        assert!(registry.remove(&token));
        assert!(!registry.remove(&token));
        assert!(registry.get(&token, 60).is_none());
    }

    #[test]
    fn test_expired_sessions_are_evicted() {
        let registry = AuthSessionRegistry::new();
        let token = registry.create("acct-1", Collection::Users);
        std::thread::sleep(std::time::Duration::from_millis(1100));

        assert_eq!(registry.cleanup_expired(5), 0);
        assert!(registry.get(&token, 0).is_none());
        assert_eq!(registry.active_count(), 0);

        registry.create("acct-2", Collection::Users);
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert_eq!(registry.cleanup_expired(0), 1);
    }

    #[test]
    fn test_cleanup_count_ignores_concurrent_creates() {
        let registry = AuthSessionRegistry::new();
        for i in 0..3 {
            registry.create(&format!("old-{i}"), Collection::Users);
        }
        std::thread::sleep(std::time::Duration::from_millis(1100));

        let removed = std::thread::scope(|scope| {
            for t in 0..4 {
                let registry = &registry;
                scope.spawn(move || {
                    for i in 0..50 {
                        registry.create(&format!("new-{t}-{i}"), Collection::Users);
                    }
                });
            }
            registry.cleanup_expired(0)
        });

        assert_eq!(removed, 3);
        assert_eq!(registry.active_count(), 200);
    }
}
