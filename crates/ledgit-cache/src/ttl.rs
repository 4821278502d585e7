use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

struct Slot<V> {
    stored_at: Instant,
    value: V,
}

/// Bounded cache whose entries expire after a fixed time to live.
///
/// Reads use `peek`, so recency is never refreshed: the entry evicted at
/// capacity is always the one inserted longest ago. Expiry is checked on
/// every read and an expired entry is dropped on the spot.
pub struct TtlCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, Slot<V>>>,
    ttl: Duration,
}

impl<K: Hash + Eq + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        let fresh = entries
            .peek(key)
            .map(|slot| slot.stored_at.elapsed() < self.ttl)?;
        if fresh {
            entries.peek(key).map(|slot| slot.value.clone())
        } else {
            entries.pop(key);
            None
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().expect("lock poisoned");
        // re-inserting must move the key to the back of the eviction order
        entries.pop(&key);
        entries.put(
            key,
            Slot {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.lock().expect("lock poisoned").pop(key);
    }

    pub fn clear(&self) {
        self.entries.lock().expect("lock poisoned").clear();
    }

    /// Entries held, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("len", &self.entries.lock().map(|e| e.len()).unwrap_or(0))
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entries_are_served() {
        let cache = TtlCache::new(4, Duration::from_secs(60));
        cache.insert("repos".to_string(), vec![1, 2, 3]);
        assert_eq!(cache.get(&"repos".to_string()), Some(vec![1, 2, 3]));
    }

    #[test]
    fn expired_entries_are_dropped_on_read() {
        let cache = TtlCache::new(4, Duration::ZERO);
        cache.insert("commits:demo", 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"commits:demo"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn oldest_insert_is_evicted_even_if_recently_read() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);
        // reading "a" must not protect it
        assert_eq!(cache.get(&"a"), Some(1));
        cache.insert("c", 3);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn reinsert_refreshes_position() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);
        cache.insert("c", 3);
        assert_eq!(cache.get(&"a"), Some(10));
        assert_eq!(cache.get(&"b"), None);
    }

    #[test]
    fn invalidation() {
        let cache = TtlCache::new(8, Duration::from_secs(60));
        cache.insert("branches:demo".to_string(), 1);
        cache.insert("branches:other".to_string(), 2);
        cache.insert("commits:demo".to_string(), 3);
        cache.invalidate(&"branches:other".to_string());
        assert_eq!(cache.get(&"branches:other".to_string()), None);
        assert_eq!(cache.get(&"commits:demo".to_string()), Some(3));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_capacity_still_holds_one() {
        let cache = TtlCache::new(0, Duration::from_secs(60));
        cache.insert(1, "x");
        assert_eq!(cache.get(&1), Some("x"));
    }
}
