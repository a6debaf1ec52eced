// TTL cache for advisory text
//
// Entries expire after the TTL and are evicted lazily on lookup. When the
// cache is full the oldest insertion is dropped (FIFO, not LRU): lookups do
// not refresh an entry's position.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    text: String,
    created_at: Instant,
}

/// Bounded advisory cache keyed by request key
#[derive(Debug)]
pub struct AdvisoryCache {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    ttl: Duration,
    capacity: usize,
}

impl AdvisoryCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Fresh text for `key`, evicting the entry if it has expired
    pub fn get(&mut self, key: &str, now: Instant) -> Option<String> {
        let entry = self.entries.get(key)?;
        if now.saturating_duration_since(entry.created_at) <= self.ttl {
            return Some(entry.text.clone());
        }

        debug!(key, "advisory cache entry expired");
        self.remove(key);
        None
    }

    /// Store text, returning the number of entries evicted to make room
    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>, now: Instant) -> usize {
        let key = key.into();
        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        }
        self.entries.insert(
            key.clone(),
            CacheEntry {
                text: text.into(),
                created_at: now,
            },
        );
        self.order.push_back(key);

        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            debug!(key = %oldest, "advisory cache full, evicted oldest entry");
            evicted += 1;
        }
        evicted
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.created_at) > self.ttl)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_hit_within_ttl() {
        let start = Instant::now();
        let mut cache = AdvisoryCache::new(HOUR, 10);
        cache.insert("k", "text", start);

        assert_eq!(cache.get("k", start + HOUR), Some("text".to_string()));
        assert_eq!(cache.get("missing", start), None);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_lookup() {
        let start = Instant::now();
        let mut cache = AdvisoryCache::new(HOUR, 10);
        cache.insert("k", "text", start);

        assert_eq!(cache.get("k", start + HOUR + Duration::from_secs(1)), None);
        assert!(!cache.contains("k"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_fifo_eviction() {
        let start = Instant::now();
        let mut cache = AdvisoryCache::new(HOUR, 2);
        cache.insert("a", "1", start);
        cache.insert("b", "2", start);
        // A lookup does not protect "a" from eviction
        assert!(cache.get("a", start).is_some());

        assert_eq!(cache.insert("c", "3", start), 1);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_reinsert_moves_to_back() {
        let start = Instant::now();
        let mut cache = AdvisoryCache::new(HOUR, 2);
        cache.insert("a", "1", start);
        cache.insert("b", "2", start);
        cache.insert("a", "1b", start);
        cache.insert("c", "3", start);

        assert!(!cache.contains("b"));
        assert_eq!(cache.get("a", start), Some("1b".to_string()));
    }

    #[test]
    fn test_purge_expired() {
        let start = Instant::now();
        let mut cache = AdvisoryCache::new(Duration::from_secs(10), 10);
        cache.insert("old", "1", start);
        cache.insert("new", "2", start + Duration::from_secs(8));

        assert_eq!(cache.purge_expired(start + Duration::from_secs(12)), 1);
        assert!(cache.contains("new"));
        assert_eq!(cache.len(), 1);
    }
}
