use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::registry::Registry;

/// TTL + LRU cache, reporting hit/miss/size to a `Registry`. One
/// implementation backed by the `lru` crate, rather than a choice between
/// an external cache and a manual dict fallback.
pub struct Cache<V: Clone> {
    inner: Mutex<LruCache<String, (Instant, V)>>,
    ttl: Duration,
    cache_type: &'static str,
    registry: std::sync::Arc<Registry>,
}

impl<V: Clone> Cache<V> {
    pub fn new(
        max_size: usize,
        ttl: Duration,
        cache_type: &'static str,
        registry: std::sync::Arc<Registry>,
    ) -> Self {
        let capacity = NonZeroUsize::new(max_size.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
            cache_type,
            registry,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock().unwrap();
        let hit = match inner.get(key) {
            Some((inserted_at, value)) if inserted_at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                inner.pop(key);
                None
            }
            None => None,
        };
        match &hit {
            Some(_) => self.registry.record_cache_hit(self.cache_type),
            None => self.registry.record_cache_miss(self.cache_type),
        }
        hit
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        let mut inner = self.inner.lock().unwrap();
        inner.put(key.into(), (Instant::now(), value));
        let size = inner.len();
        drop(inner);
        self.registry.update_cache_size(self.cache_type, size);
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
        self.registry.update_cache_size(self.cache_type, 0);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_entry_counts_as_miss() {
        let registry = std::sync::Arc::new(Registry::new().unwrap());
        let cache: Cache<String> = Cache::new(10, Duration::from_millis(5), "test", registry);
        cache.set("k", "v".to_string());
        assert_eq!(cache.get("k"), Some("v".to_string()));
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn eviction_respects_capacity() {
        let registry = std::sync::Arc::new(Registry::new().unwrap());
        let cache: Cache<i32> = Cache::new(2, Duration::from_secs(60), "test", registry);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
    }
}
