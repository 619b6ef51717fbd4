use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::{CacheKey, CacheStore};

const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process cache with LRU eviction and per-entry TTL.
///
/// Expired entries are dropped lazily on access. Suitable for single
/// instance deployments and tests; multi-instance deployments should use
/// [`crate::RedisCache`] so dedup locks are shared.
#[derive(Clone)]
pub struct MemoryCache {
    store: Arc<RwLock<LruCache<String, Entry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or_else(|| NonZeroUsize::new(DEFAULT_CAPACITY).expect("non-zero constant"));
        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCache {
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<()> {
        let mut store = self.store.write().await;
        store.put(key.to_string(), Entry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn set_if_absent(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<bool> {
        let mut store = self.store.write().await;
        let backend_key = key.to_string();
        if let Some(existing) = store.get(&backend_key) {
            if !existing.is_expired() {
                return Ok(false);
            }
            store.pop(&backend_key);
        }
        store.put(backend_key, Entry::new(value.to_string(), ttl));
        Ok(true)
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let mut store = self.store.write().await;
        let backend_key = key.to_string();
        match store.get(&backend_key) {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.value.clone())),
            Some(_) => {
                store.pop(&backend_key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        let mut store = self.store.write().await;
        store.pop(&key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_key(digest: &str) -> CacheKey {
        CacheKey::DedupLock {
            digest: digest.to_string(),
        }
    }

    #[tokio::test]
    async fn set_and_get_round_trip() {
        let cache = MemoryCache::new();
        let key = lock_key("a");
        cache.set(&key, "1", Duration::from_secs(30)).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn set_if_absent_rejects_live_entry() {
        let cache = MemoryCache::new();
        let key = lock_key("b");
        assert!(cache
            .set_if_absent(&key, "1", Duration::from_secs(30))
            .await
            .unwrap());
        assert!(!cache
            .set_if_absent(&key, "1", Duration::from_secs(30))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn expired_entries_are_dropped() {
        let cache = MemoryCache::new();
        let key = lock_key("c");
        cache
            .set(&key, "1", Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get(&key).await.unwrap().is_none());
        // And the slot becomes claimable again.
        assert!(cache
            .set_if_absent(&key, "2", Duration::from_secs(30))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let cache = MemoryCache::new();
        let key = lock_key("d");
        cache.set(&key, "1", Duration::from_secs(30)).await.unwrap();
        cache.delete(&key).await.unwrap();
        cache.delete(&key).await.unwrap();
        assert!(cache.get(&key).await.unwrap().is_none());
    }
}
