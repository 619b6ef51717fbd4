pub mod error;
pub mod memory;
pub mod redis;

pub use error::{CacheError, Result};
pub use memory::MemoryCache;
pub use redis::RedisCache;

use std::fmt;
use std::time::Duration;

/// Namespace prefix applied to every key so Klara entries can share a
/// Redis instance with other services.
pub const KEY_PREFIX: &str = "klara:";

/// Typed cache key. Rendered via `Display` into the backend key string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKey {
    /// In-flight submission lock, keyed by the dedup digest.
    DedupLock { digest: String },
    /// Serialized conversation history blob.
    ConversationHistory { conversation_id: String },
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DedupLock { digest } => write!(f, "{KEY_PREFIX}dedup:{digest}"),
            Self::ConversationHistory { conversation_id } => {
                write!(f, "{KEY_PREFIX}history:{conversation_id}")
            }
        }
    }
}

/// Object-safe cache abstraction over a TTL key/value store.
///
/// Values are strings; callers serialize to JSON where needed. Keeping the
/// trait non-generic lets the chat core hold it as `Arc<dyn CacheStore>`.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Store a value with a TTL, overwriting any existing entry.
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<()>;

    /// Atomically store a value only if the key is absent. Returns `true`
    /// when the value was stored, `false` when the key already existed.
    async fn set_if_absent(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<bool>;

    /// Fetch a value, or `None` when missing or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>>;

    /// Remove a key. Removing a missing key is not an error.
    async fn delete(&self, key: &CacheKey) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        let lock = CacheKey::DedupLock {
            digest: "abc123".to_string(),
        };
        assert_eq!(lock.to_string(), "klara:dedup:abc123");

        let history = CacheKey::ConversationHistory {
            conversation_id: "65f0".to_string(),
        };
        assert_eq!(history.to_string(), "klara:history:65f0");
    }
}
