//! Memoization of whole scrape operations.

use horseman_core::{Result, TtlCache};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// A TTL cache of successful results keyed by normalized target. Failures are
/// never stored, and concurrent misses for the same key each run the operation.
pub struct Memoized<V> {
    name: &'static str,
    cache: TtlCache<String, V>,
}

impl<V: Clone> Memoized<V> {
    pub fn new(name: &'static str, ttl: Duration, capacity: usize) -> Self {
        Self {
            name,
            cache: TtlCache::new(ttl, capacity),
        }
    }

    pub async fn get_or_try_insert_with<F, Fut>(&self, key: String, operation: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(hit) = self.cache.get(&key) {
            debug!("{} cache hit for {}", self.name, key);
            return Ok(hit);
        }

        let value = operation().await?;
        self.cache.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}
