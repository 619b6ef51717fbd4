use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use crate::error::{CacheError, Result};
use crate::{CacheKey, CacheStore};

/// Redis-backed cache.
///
/// Uses `ConnectionManager` for automatic reconnection. The dedup lock
/// relies on `SET .. NX EX` so set-if-absent-with-TTL is a single atomic
/// operation across all service instances.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::Connection(format!("invalid Redis URL: {e}")))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(format!("Redis connection failed: {e}")))?;
        info!("Connected to Redis");
        Ok(Self { manager })
    }
}

#[async_trait::async_trait]
impl CacheStore for RedisCache {
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key.to_string(), value, ttl.as_secs())
            .await?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.manager.clone();
        let stored: Option<String> = redis::cmd("SET")
            .arg(key.to_string())
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await?;
        Ok(stored.is_some())
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key.to_string()).await?;
        Ok(value)
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key.to_string()).await?;
        Ok(())
    }
}
