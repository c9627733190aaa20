//! Bounded in-memory cache with per-entry expiry.
//!
//! Backs both the correlation map (token → captured widget payload) and the
//! memoization of whole scrape operations. Entries are stored in a sharded
//! concurrent map so independent keys never contend on a single lock.
//!
//! ## Expiry
//!
//! Every entry lives for the cache's TTL from the moment it was written.
//! Expired entries are never returned and are purged on each insert, so an
//! entry that is never read still leaves the cache within one TTL of the next
//! write. When the cache is full after purging, the oldest entry is evicted.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }
}

pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
    max_entries: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Store `value` under `key`. A second write to the same key replaces the
    /// first one.
    pub fn insert(&self, key: K, value: V) {
        self.purge_expired();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }

        let entry = CacheEntry {
            value,
            inserted_at: Instant::now(),
        };
        if self.entries.insert(key, entry).is_some() {
            debug!("Cache entry overwritten before it was read");
        }
    }

    /// Return a clone of the live value for `key`, leaving it in place.
    pub fn get(&self, key: &K) -> Option<V> {
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired(self.ttl) {
                return Some(entry.value.clone());
            }
        }
        let ttl = self.ttl;
        self.entries.remove_if(key, |_, entry| entry.is_expired(ttl));
        None
    }

    /// Remove and return the live value for `key`.
    pub fn take(&self, key: &K) -> Option<V> {
        let ttl = self.ttl;
        self.entries
            .remove(key)
            .filter(|(_, entry)| !entry.is_expired(ttl))
            .map(|(_, entry)| entry.value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired(self.ttl))
            .unwrap_or(false)
    }

    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| !entry.is_expired(ttl));
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().inserted_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(30), 8);
        cache.insert("token".to_string(), 1);
        assert_eq!(cache.get(&"token".to_string()), Some(1));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.get(&"token".to_string()), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unread_entries_are_purged_on_next_insert() {
        let cache = TtlCache::new(Duration::from_secs(30), 8);
        cache.insert("abandoned".to_string(), 1);
        tokio::time::advance(Duration::from_secs(45)).await;

        cache.insert("fresh".to_string(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key(&"fresh".to_string()));
    }

    #[test]
    fn test_take_is_read_once() {
        let cache = TtlCache::new(Duration::from_secs(30), 8);
        cache.insert("token", "payload");
        assert_eq!(cache.take(&"token"), Some("payload"));
        assert_eq!(cache.take(&"token"), None);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = TtlCache::new(Duration::from_secs(30), 8);
        cache.insert("token", 1);
        cache.insert("token", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"token"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_evicts_oldest() {
        let cache = TtlCache::new(Duration::from_secs(30), 2);
        cache.insert("a", 1);
        tokio::time::advance(Duration::from_millis(10)).await;
        cache.insert("b", 2);
        tokio::time::advance(Duration::from_millis(10)).await;
        cache.insert("c", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[tokio::test]
    async fn test_concurrent_writers_keep_their_own_keys() {
        let cache = Arc::new(TtlCache::new(Duration::from_secs(30), 64));
        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let key = format!("token-{}", i);
                cache.insert(key.clone(), i);
                tokio::task::yield_now().await;
                cache.take(&key)
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Some(i));
        }
    }
}
