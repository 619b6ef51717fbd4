use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use klara_cache::{CacheKey, CacheStore};

use crate::error::Result;

/// How long an in-flight submission blocks identical resubmissions.
pub const DEDUP_LOCK_TTL: Duration = Duration::from_secs(30);

/// Stable digest over `(user_id, message)`. The message is trimmed and
/// lower-cased so trivially re-typed duplicates hash the same.
pub fn digest(user_id: &str, message: &str) -> String {
    let normalized = message.trim().to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(b":");
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short-lived cache lock preventing duplicate concurrent submissions.
pub struct DedupGuard {
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl DedupGuard {
    pub fn new(cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Try to take the lock. Returns the lock key when acquired, `None`
    /// when an identical submission is already in flight. A duplicate hit
    /// leaves the existing lock and its TTL untouched.
    pub async fn acquire(&self, user_id: &str, message: &str) -> Result<Option<CacheKey>> {
        let key = CacheKey::DedupLock {
            digest: digest(user_id, message),
        };
        let acquired = self.cache.set_if_absent(&key, "1", self.ttl).await?;
        Ok(acquired.then_some(key))
    }

    pub async fn release(&self, key: &CacheKey) -> Result<()> {
        self.cache.delete(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use klara_cache::MemoryCache;

    #[test]
    fn digest_normalizes_message() {
        assert_eq!(digest("u1", "  What is OpenGov? "), digest("u1", "what is opengov?"));
        assert_ne!(digest("u1", "hello"), digest("u2", "hello"));
        assert_ne!(digest("u1", "hello"), digest("u1", "goodbye"));
    }

    #[tokio::test]
    async fn second_acquire_is_rejected_until_release() {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        let guard = DedupGuard::new(cache, DEDUP_LOCK_TTL);

        let key = guard.acquire("u1", "hello").await.unwrap().unwrap();
        assert!(guard.acquire("u1", "hello").await.unwrap().is_none());
        // Same text from another user is not a duplicate.
        assert!(guard.acquire("u2", "hello").await.unwrap().is_some());

        guard.release(&key).await.unwrap();
        assert!(guard.acquire("u1", "hello").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn lock_expires_on_its_own() {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        let guard = DedupGuard::new(cache, Duration::from_millis(20));

        guard.acquire("u1", "hello").await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(guard.acquire("u1", "hello").await.unwrap().is_some());
    }
}
