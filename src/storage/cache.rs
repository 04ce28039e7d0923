//! Process-wide key/value cache with per-entry expiry.

use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Concurrent TTL cache; cloning shares the underlying map.
pub struct TtlCache<K, V> {
    entries: Arc<DashMap<K, Entry<V>>>,
    ttl: Duration,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live value for `key`; expired entries are evicted on read
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key)
            && entry.expires_at > now
        {
            return Some(entry.value.clone());
        }
        self.entries.remove_if(key, |_, e| e.expires_at <= now);
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.ttl);
    }

    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Cached value, or compute and cache it
    pub fn get_or_insert_with<F>(&self, key: K, f: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(v) = self.get(&key) {
            return v;
        }
        let value = f();
        self.insert(key, value.clone());
        value
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache: TtlCache<(String, u32), u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert(("Cloud Migration".to_string(), 30), 7);
        assert_eq!(cache.get(&("Cloud Migration".to_string(), 30)), Some(7));
        assert_eq!(cache.get(&("Cloud Migration".to_string(), 60)), None);
    }

    #[test]
    fn test_expiry() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert_with_ttl("k", 1, Duration::ZERO);
        assert_eq!(cache.get(&"k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_or_insert_with_computes_once() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let mut calls = 0;
        let a = cache.get_or_insert_with("k", || {
            calls += 1;
            10
        });
        let b = cache.get_or_insert_with("k", || {
            calls += 1;
            20
        });
        assert_eq!((a, b), (10, 10));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_clone_shares_entries() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let other = cache.clone();
        cache.insert(1, "one");
        assert_eq!(other.get(&1), Some("one"));
        other.invalidate(&1);
        assert!(cache.get(&1).is_none());
    }

    #[test]
    fn test_purge_expired() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert_with_ttl(1, 1, Duration::ZERO);
        cache.insert(2, 2);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }
}
