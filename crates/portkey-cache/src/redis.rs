use async_trait::async_trait;
use portkey_core::cache::Result;
use portkey_core::{CacheError, CachedLink, DayCount, RedirectCache, SearchEntry, ShortCode};
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// A Redis-based implementation of [`RedirectCache`].
///
/// Values are stored as JSON strings under `link:`, `search:` and
/// `analytics:daily:` keys, with the TTL applied per write via `SET EX`.
#[derive(Debug, Clone)]
pub struct RedisRedirectCache {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if message.to_ascii_lowercase().contains("timed out") {
        CacheError::Timeout(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisRedirectCache {
    /// Creates a new Redis redirect cache.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self {
            conn,
            key_prefix: "pk:".to_string(),
        }
    }

    /// Creates a new Redis redirect cache with a custom key prefix.
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    fn link_key(&self, code: &ShortCode) -> String {
        format!("{}link:{}", self.key_prefix, code.as_str())
    }

    fn search_key(&self, url: &str) -> String {
        format!("{}search:{}", self.key_prefix, url)
    }

    fn daily_key(&self, code: &ShortCode) -> String {
        format!("{}analytics:daily:{}", self.key_prefix, code.as_str())
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(cached)) => {
                debug!(key = %key, "cache hit in Redis");
                serde_json::from_str::<T>(&cached).map(Some).map_err(|e| {
                    warn!(key = %key, error = %e, "failed to deserialize cached value");
                    CacheError::InvalidData(format!("invalid cached value for key '{key}': {e}"))
                })
            }
            Ok(None) => {
                trace!(key = %key, "cache miss in Redis");
                Ok(None)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Redis error on get");
                Err(map_redis_error("failed to fetch value from Redis", e))
            }
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(value).map_err(|e| {
            warn!(key = %key, error = %e, "failed to serialize value for caching");
            CacheError::Serialization(format!("failed to serialize cache value: {e}"))
        })?;

        let mut conn = self.conn.clone();
        match conn
            .set_ex::<_, _, ()>(key, json, ttl.as_secs().max(1))
            .await
        {
            Ok(()) => {
                debug!(key = %key, ttl_secs = ttl.as_secs(), "cached value in Redis");
                Ok(())
            }
            Err(e) => {
                warn!(key = %key, error = %e, "failed to cache value in Redis");
                Err(map_redis_error("failed to write value to Redis", e))
            }
        }
    }

    async fn del_key(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        match conn.del::<_, ()>(key).await {
            Ok(()) => {
                debug!(key = %key, "removed value from Redis cache");
                Ok(())
            }
            Err(e) => {
                warn!(key = %key, error = %e, "failed to remove value from Redis cache");
                Err(map_redis_error("failed to delete value from Redis", e))
            }
        }
    }
}

#[async_trait]
impl RedirectCache for RedisRedirectCache {
    async fn get_link(&self, code: &ShortCode) -> Result<Option<CachedLink>> {
        self.get_json(&self.link_key(code)).await
    }

    async fn set_link(&self, code: &ShortCode, entry: &CachedLink, ttl: Duration) -> Result<()> {
        self.set_json(&self.link_key(code), entry, ttl).await
    }

    async fn del_link(&self, code: &ShortCode) -> Result<()> {
        self.del_key(&self.link_key(code)).await
    }

    async fn get_search(&self, url: &str) -> Result<Option<SearchEntry>> {
        self.get_json(&self.search_key(url)).await
    }

    async fn set_search(&self, url: &str, entry: &SearchEntry, ttl: Duration) -> Result<()> {
        self.set_json(&self.search_key(url), entry, ttl).await
    }

    async fn del_search(&self, url: &str) -> Result<()> {
        self.del_key(&self.search_key(url)).await
    }

    async fn get_daily(&self, code: &ShortCode) -> Result<Option<Vec<DayCount>>> {
        self.get_json(&self.daily_key(code)).await
    }

    async fn set_daily(&self, code: &ShortCode, counts: &[DayCount], ttl: Duration) -> Result<()> {
        self.set_json(&self.daily_key(code), &counts, ttl).await
    }

    async fn del_daily(&self, code: &ShortCode) -> Result<()> {
        self.del_key(&self.daily_key(code)).await
    }
}
