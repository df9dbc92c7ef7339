//! In-memory response cache with per-entry expiry

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

/// A cached value and its lifetime
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// An entry is live up to and including its expiry instant
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Cache counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

impl CacheStats {
    /// Hit rate as a percentage of all lookups (0 when nothing was looked up)
    pub fn hit_rate_percent(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }
}

/// Key to value store with lazy and periodic expiry
///
/// All operations are synchronous and do no I/O; the scheduler calls them
/// inline while holding its state lock.
#[derive(Debug)]
pub struct CacheStore<V> {
    entries: HashMap<String, CacheEntry<V>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<V> Default for CacheStore<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }
}

impl<V: Clone> CacheStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live value, evicting the entry if it has expired
    pub fn get(&mut self, key: &str, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            None => {
                debug!(%key, "CacheStore::get: miss");
                self.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            debug!(%key, "CacheStore::get: expired, evicting");
            self.entries.remove(key);
            self.evictions += 1;
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert or overwrite an entry
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Duration, now: Instant) {
        let key = key.into();
        debug!(%key, ttl_ms = ttl.as_millis() as u64, "CacheStore::set: called");
        self.entries.insert(key, CacheEntry::new(value, now, ttl));
    }

    /// Remove one entry, returning whether it existed
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove every expired entry, returning how many were evicted
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        self.evictions += removed as u64;
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "CacheStore::sweep: evicted expired entries");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            size: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let mut cache = CacheStore::new();
        let now = Instant::now();
        cache.set("k", "v".to_string(), Duration::from_millis(1000), now);

        assert_eq!(cache.get("k", now), Some("v".to_string()));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_expired_entry_evicted_once() {
        let mut cache = CacheStore::new();
        let now = Instant::now();
        cache.set("k", "v".to_string(), Duration::from_millis(1000), now);

        // Still live exactly at expiry
        assert!(cache.get("k", now + Duration::from_millis(1000)).is_some());

        let later = now + Duration::from_millis(1001);
        assert_eq!(cache.get("k", later), None);
        assert_eq!(cache.stats().evictions, 1);

        // Key is gone, so a second lookup is a plain miss
        assert_eq!(cache.get("k", later), None);
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.stats().misses, 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_overwrites() {
        let mut cache = CacheStore::new();
        let now = Instant::now();
        cache.set("k", 1, Duration::from_millis(10), now);
        cache.set("k", 2, Duration::from_secs(60), now);

        assert_eq!(cache.get("k", now + Duration::from_millis(500)), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let mut cache = CacheStore::new();
        let now = Instant::now();
        cache.set("short", 1, Duration::from_millis(100), now);
        cache.set("long", 2, Duration::from_secs(60), now);
        cache.set("also-short", 3, Duration::from_millis(50), now);

        let removed = cache.sweep(now + Duration::from_millis(200));
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 2);
        assert_eq!(cache.get("long", now), Some(2));
    }

    #[test]
    fn test_remove_and_clear_do_not_count_evictions() {
        let mut cache = CacheStore::new();
        let now = Instant::now();
        cache.set("a", 1, Duration::from_secs(1), now);
        cache.set("b", 2, Duration::from_secs(1), now);

        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_hit_rate_percent() {
        let mut cache = CacheStore::new();
        let now = Instant::now();
        assert_eq!(cache.stats().hit_rate_percent(), 0.0);

        cache.set("a", 1, Duration::from_secs(1), now);
        cache.get("a", now);
        cache.get("a", now);
        cache.get("a", now);
        cache.get("missing", now);

        assert_eq!(cache.stats().hit_rate_percent(), 75.0);
    }
}
