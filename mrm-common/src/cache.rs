//! Time-to-live cache
//!
//! Entries expire once more than `ttl` has elapsed since insertion. Expiry is
//! checked lazily: a read that finds an expired entry evicts it and reports a
//! miss.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::time::Clock;

/// Default lifetime for cached lookups (24 hours)
pub const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;

struct CacheEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

/// Thread-safe TTL cache driven by an injectable clock
pub struct TtlCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up `key`, evicting it if it has expired
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let expired = match entries.get(key) {
            Some(entry) => self.is_expired(entry, now),
            None => return None,
        };

        if expired {
            entries.remove(key);
            debug!("Cache entry expired and evicted");
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert or replace `key`, restarting its lifetime
    pub fn insert(&self, key: K, value: V) {
        let inserted_at = self.clock.now();
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, CacheEntry { value, inserted_at });
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .map(|entry| entry.value)
    }

    /// Number of stored entries, expired ones included until they are touched
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: DateTime<Utc>) -> bool {
        now - entry.inserted_at > self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    fn cache_with_clock() -> (TtlCache<String, u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = TtlCache::new(Duration::seconds(DEFAULT_TTL_SECS), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_hit_before_expiry() {
        let (cache, clock) = cache_with_clock();
        cache.insert("work-1".to_string(), 7);

        clock.advance(Duration::hours(23));
        assert_eq!(cache.get(&"work-1".to_string()), Some(7));
    }

    #[test]
    fn test_entry_at_exact_ttl_is_still_valid() {
        let (cache, clock) = cache_with_clock();
        cache.insert("work-1".to_string(), 7);

        clock.advance(Duration::hours(24));
        assert_eq!(cache.get(&"work-1".to_string()), Some(7));
    }

    #[test]
    fn test_read_after_ttl_misses_and_evicts() {
        let (cache, clock) = cache_with_clock();
        cache.insert("work-1".to_string(), 7);
        assert_eq!(cache.len(), 1);

        clock.advance(Duration::hours(24) + Duration::seconds(1));

        assert_eq!(cache.get(&"work-1".to_string()), None);
        assert_eq!(cache.len(), 0, "Expired entry should be evicted on read");
    }

    #[test]
    fn test_reinsert_restarts_lifetime() {
        let (cache, clock) = cache_with_clock();
        cache.insert("work-1".to_string(), 1);
        clock.advance(Duration::hours(20));
        cache.insert("work-1".to_string(), 2);
        clock.advance(Duration::hours(20));

        assert_eq!(cache.get(&"work-1".to_string()), Some(2));
    }

    #[test]
    fn test_expiry_is_per_entry() {
        let (cache, clock) = cache_with_clock();
        cache.insert("old".to_string(), 1);
        clock.advance(Duration::hours(12));
        cache.insert("new".to_string(), 2);
        clock.advance(Duration::hours(13));

        assert_eq!(cache.get(&"old".to_string()), None);
        assert_eq!(cache.get(&"new".to_string()), Some(2));
    }

    #[test]
    fn test_remove() {
        let (cache, _clock) = cache_with_clock();
        cache.insert("work-1".to_string(), 7);
        assert_eq!(cache.remove(&"work-1".to_string()), Some(7));
        assert!(cache.is_empty());
    }
}
