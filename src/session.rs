//! Short-lived conversational state for multi-turn tools.
//!
//! Sessions live only in process memory and expire after a fixed TTL.
//! Expired sessions are invisible to [`SessionStore::get`] and are reclaimed
//! by [`SessionStore::sweep`], which the store also runs on every create.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::cache::expiry_after;

/// Default session lifetime (30 minutes).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Storage for per-conversation state keyed by opaque session id.
pub trait SessionStore<S>: Send + Sync {
    /// Stores `state` under a fresh id and returns the id.
    fn create(&mut self, state: S) -> String;

    /// Returns the live state for `id`, if any.
    fn get(&self, id: &str) -> Option<&S>;

    /// Replaces the state of a live session and refreshes its expiry.
    ///
    /// Returns `false` if the session does not exist or has expired.
    fn update(&mut self, id: &str, state: S) -> bool;

    /// Ends a session, returning its state if it was live.
    fn remove(&mut self, id: &str) -> Option<S>;

    /// Drops expired sessions and returns how many were removed.
    fn sweep(&mut self) -> usize;

    /// Number of sessions held, including not yet swept expired ones.
    fn len(&self) -> usize;

    /// Returns `true` if no sessions are held.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct SessionEntry<S> {
    state: S,
    expires_at: Instant,
}

/// A [`SessionStore`] backed by a `HashMap`.
#[derive(Debug)]
pub struct InMemorySessionStore<S> {
    sessions: HashMap<String, SessionEntry<S>>,
    ttl: Duration,
}

impl<S> InMemorySessionStore<S> {
    /// Creates an empty store whose sessions live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    /// Session lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// [`SessionStore::create`] against an explicit clock.
    pub fn create_at(&mut self, state: S, now: Instant) -> String {
        self.sweep_at(now);
        let id = Uuid::new_v4().to_string();
        self.sessions.insert(
            id.clone(),
            SessionEntry {
                state,
                expires_at: expiry_after(now, self.ttl),
            },
        );
        tracing::debug!(session = %id, "Created session");
        id
    }

    /// [`SessionStore::get`] against an explicit clock.
    #[must_use]
    pub fn get_at(&self, id: &str, now: Instant) -> Option<&S> {
        self.sessions
            .get(id)
            .filter(|entry| now <= entry.expires_at)
            .map(|entry| &entry.state)
    }

    /// [`SessionStore::update`] against an explicit clock.
    pub fn update_at(&mut self, id: &str, state: S, now: Instant) -> bool {
        match self.sessions.get_mut(id) {
            Some(entry) if now <= entry.expires_at => {
                entry.state = state;
                entry.expires_at = expiry_after(now, self.ttl);
                true
            }
            _ => false,
        }
    }

    /// [`SessionStore::sweep`] against an explicit clock.
    pub fn sweep_at(&mut self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| now <= entry.expires_at);
        let removed = before - self.sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "Swept expired sessions");
        }
        removed
    }
}

impl<S> Default for InMemorySessionStore<S> {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl<S: Send + Sync> SessionStore<S> for InMemorySessionStore<S> {
    fn create(&mut self, state: S) -> String {
        self.create_at(state, Instant::now())
    }

    fn get(&self, id: &str) -> Option<&S> {
        self.get_at(id, Instant::now())
    }

    fn update(&mut self, id: &str, state: S) -> bool {
        self.update_at(id, state, Instant::now())
    }

    fn remove(&mut self, id: &str) -> Option<S> {
        let now = Instant::now();
        self.sessions
            .remove(id)
            .filter(|entry| now <= entry.expires_at)
            .map(|entry| entry.state)
    }

    fn sweep(&mut self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_get() {
        let mut store = InMemorySessionStore::default();
        let id = store.create(7_u32);
        assert_eq!(store.get(&id), Some(&7));
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn expired_sessions_are_invisible() {
        let mut store = InMemorySessionStore::new(Duration::from_secs(10));
        let now = Instant::now();
        let id = store.create_at("a", now);
        assert!(store.get_at(&id, now + Duration::from_secs(10)).is_some());
        assert!(store.get_at(&id, now + Duration::from_secs(11)).is_none());
        assert!(!store.update_at(&id, "b", now + Duration::from_secs(11)));
    }

    #[test]
    fn update_refreshes_expiry() {
        let mut store = InMemorySessionStore::new(Duration::from_secs(10));
        let now = Instant::now();
        let id = store.create_at(1, now);
        assert!(store.update_at(&id, 2, now + Duration::from_secs(8)));
        assert_eq!(store.get_at(&id, now + Duration::from_secs(15)), Some(&2));
    }

    #[test]
    fn huge_ttl_does_not_overflow() {
        let mut store = InMemorySessionStore::new(Duration::from_secs(u64::MAX));
        let now = Instant::now();
        let id = store.create_at(1, now);
        assert!(store.update_at(&id, 2, now + Duration::from_secs(60)));
        assert_eq!(store.get_at(&id, now + Duration::from_secs(120)), Some(&2));
    }

    #[test]
    fn create_sweeps_expired_sessions() {
        let mut store = InMemorySessionStore::new(Duration::from_secs(1));
        let now = Instant::now();
        store.create_at(1, now);
        store.create_at(2, now + Duration::from_secs(5));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_returns_state() {
        let mut store = InMemorySessionStore::default();
        let id = store.create("x".to_string());
        assert_eq!(store.remove(&id).as_deref(), Some("x"));
        assert!(store.is_empty());
        assert!(store.remove(&id).is_none());
    }
}
