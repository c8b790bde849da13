//! Bounded, recency-ordered, TTL-expiring key/value store.
//!
//! Entries live in an [`IndexMap`] whose insertion order doubles as recency
//! rank: index 0 is the least recently used entry, the last index the most
//! recently used. Every `get`, `has` and `set` that touches a live entry
//! moves it to the back.
//!
//! Expiry is checked lazily. An entry is a hit while `now <= expires_at`;
//! once past that instant the next lookup evicts it and reports a miss.

use std::hash::Hash;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde_json::Value;

/// Default maximum number of entries.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default time-to-live for an entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Longest lifetime [`expiry_after`] hands out (about a century).
pub const MAX_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// The instant `ttl` after `now`.
///
/// Lifetimes too large for `Instant` are clamped to [`MAX_LIFETIME`], so a
/// huge configured TTL means "effectively never" instead of a panic.
#[must_use]
pub fn expiry_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(MAX_LIFETIME))
        .unwrap_or(now)
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// A bounded LRU cache whose entries expire after a fixed TTL.
#[derive(Debug, Clone)]
pub struct Cache<K, V> {
    entries: IndexMap<K, CacheEntry<V>>,
    capacity: usize,
    ttl: Duration,
}

impl<K: Hash + Eq, V> Cache<K, V> {
    /// Creates a cache holding at most `capacity` entries, each living `ttl`.
    ///
    /// A capacity of zero is raised to one so `set` always has room.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: IndexMap::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            ttl,
        }
    }

    /// Returns the configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the configured time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Looks up `key`, promoting it to most recently used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.get_at(key, Instant::now())
    }

    /// [`Cache::get`] against an explicit clock.
    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<&V> {
        let last = self.promote_live(key, now)?;
        self.entries.get_index(last).map(|(_, entry)| &entry.value)
    }

    /// Reports whether `key` holds a live entry.
    ///
    /// Like [`Cache::get`], this evicts an expired entry and promotes a live
    /// one to most recently used.
    pub fn has(&mut self, key: &K) -> bool {
        self.has_at(key, Instant::now())
    }

    /// [`Cache::has`] against an explicit clock.
    pub fn has_at(&mut self, key: &K, now: Instant) -> bool {
        self.promote_live(key, now).is_some()
    }

    /// Stores `value` under `key` with a fresh expiry.
    ///
    /// An existing key is overwritten and promoted. A new key evicts the
    /// least recently used entry first when the cache is full.
    pub fn set(&mut self, key: K, value: V) {
        self.set_at(key, value, Instant::now());
    }

    /// [`Cache::set`] against an explicit clock.
    pub fn set_at(&mut self, key: K, value: V, now: Instant) {
        let entry = CacheEntry {
            value,
            expires_at: expiry_after(now, self.ttl),
        };

        if self.entries.shift_remove(&key).is_none() && self.entries.len() >= self.capacity {
            if let Some((_, evicted)) = self.entries.shift_remove_index(0) {
                tracing::trace!(expired = (now > evicted.expires_at), "Evicted LRU cache entry");
            }
        }

        self.entries.insert(key, entry);
    }

    /// Moves a live entry to the back and returns its new index.
    ///
    /// An expired entry is removed and `None` returned.
    fn promote_live(&mut self, key: &K, now: Instant) -> Option<usize> {
        let index = self.entries.get_index_of(key)?;
        let (owned_key, entry) = self.entries.shift_remove_index(index)?;

        if now > entry.expires_at {
            return None;
        }

        self.entries.insert(owned_key, entry);
        Some(self.entries.len() - 1)
    }
}

impl<K: Hash + Eq, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

/// Builds the cache key for a tool invocation.
///
/// Only the top-level argument keys are sorted. Nested objects are
/// serialised in the order they arrived, so two calls that differ only in
/// nested key order produce different keys. This is a known limitation.
#[must_use]
pub fn cache_key(tool: &str, arguments: &Value) -> String {
    let Some(object) = arguments.as_object() else {
        return format!("{tool}:{arguments}");
    };

    let mut keys: Vec<&String> = object.keys().collect();
    keys.sort();

    let mut sorted = serde_json::Map::with_capacity(keys.len());
    for key in keys {
        if let Some(value) = object.get(key) {
            sorted.insert(key.clone(), value.clone());
        }
    }

    format!("{tool}:{}", Value::Object(sorted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache(capacity: usize) -> Cache<String, u32> {
        Cache::new(capacity, Duration::from_secs(60))
    }

    #[test]
    fn get_returns_stored_value() {
        let mut cache = cache(4);
        cache.set("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(&1));
        assert_eq!(cache.get(&"missing".to_string()), None);
    }

    #[test]
    fn overflow_evicts_least_recently_used() {
        let mut cache = cache(3);
        for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
            cache.set((*key).to_string(), u32::try_from(i).unwrap());
        }
        assert_eq!(cache.len(), 3);
        assert!(!cache.has(&"a".to_string()));
        assert!(cache.has(&"d".to_string()));
    }

    #[test]
    fn get_promotes_recency() {
        let mut cache = cache(3);
        cache.set("a".to_string(), 1);
        cache.set("b".to_string(), 2);
        cache.set("c".to_string(), 3);

        assert_eq!(cache.get(&"a".to_string()), Some(&1));
        cache.set("d".to_string(), 4);

        assert_eq!(cache.len(), 3);
        assert!(cache.has(&"a".to_string()));
        assert!(!cache.has(&"b".to_string()));
    }

    #[test]
    fn has_promotes_recency() {
        let mut cache = cache(2);
        cache.set("a".to_string(), 1);
        cache.set("b".to_string(), 2);

        assert!(cache.has(&"a".to_string()));
        cache.set("c".to_string(), 3);

        assert!(cache.has(&"a".to_string()));
        assert!(!cache.has(&"b".to_string()));
    }

    #[test]
    fn overwrite_promotes_without_eviction() {
        let mut cache = cache(2);
        cache.set("a".to_string(), 1);
        cache.set("b".to_string(), 2);
        cache.set("a".to_string(), 10);
        assert_eq!(cache.len(), 2);

        cache.set("c".to_string(), 3);
        assert_eq!(cache.get(&"a".to_string()), Some(&10));
        assert!(!cache.has(&"b".to_string()));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let mut cache: Cache<&str, u32> = Cache::new(4, Duration::from_secs(10));
        let start = Instant::now();
        cache.set_at("a", 1, start);

        // Boundary instant is still a hit.
        assert_eq!(cache.get_at(&"a", start + Duration::from_secs(10)), Some(&1));
        assert!(!cache.has_at(&"a", start + Duration::from_secs(11)));
        assert!(cache.is_empty());
    }

    #[test]
    fn huge_ttl_does_not_overflow() {
        let mut cache: Cache<&str, u32> = Cache::new(4, Duration::from_secs(u64::MAX));
        let start = Instant::now();
        cache.set_at("a", 1, start);
        assert_eq!(cache.get_at(&"a", start + Duration::from_secs(3600)), Some(&1));
    }

    #[test]
    fn expiry_after_clamps_unrepresentable_lifetimes() {
        let now = Instant::now();
        assert_eq!(
            expiry_after(now, Duration::from_secs(5)),
            now + Duration::from_secs(5)
        );
        assert!(expiry_after(now, Duration::MAX) > now);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut cache = cache(0);
        cache.set("a".to_string(), 1);
        cache.set("b".to_string(), 2);
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_key_sorts_top_level_keys() {
        let a = cache_key("search_docs", &json!({"query": "forms", "limit": 5}));
        let b = cache_key("search_docs", &json!({"limit": 5, "query": "forms"}));
        assert_eq!(a, b);
        assert!(a.starts_with("search_docs:"));
    }

    #[test]
    fn cache_key_keeps_nested_order() {
        let a = cache_key("t", &json!({"filter": {"x": 1, "y": 2}}));
        let b = cache_key("t", &json!({"filter": {"y": 2, "x": 1}}));
        assert_ne!(a, b);
    }

    #[test]
    fn cache_key_distinguishes_tools() {
        let args = json!({"query": "forms"});
        assert_ne!(cache_key("a", &args), cache_key("b", &args));
    }
}
