//! Redis cache module
//!
//! This module provides functionality for connecting to Redis and performing
//! key/value operations with TTL support, plus indexed keys: a key that is
//! also tracked in a set so that every key of a group can be dropped at once.

use redis::{AsyncCommands, Client, Script};
use tracing::info;

use crate::error::{CacheError, CacheResult};

/// Deletes every key listed in the index set, then the set itself.
const DELETE_INDEXED_SCRIPT: &str = r#"
local members = redis.call('SMEMBERS', KEYS[1])
for _, key in ipairs(members) do
    redis.call('DEL', key)
end
redis.call('DEL', KEYS[1])
return #members
"#;

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> CacheResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        Ok(RedisConfig { url })
    }
}

/// Redis client handle
///
/// Connections are multiplexed, so cloning the pool is cheap and every clone
/// talks to the same server.
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    /// Initialize a new Redis client
    pub async fn new(config: &RedisConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.clone()).map_err(CacheError::Connection)?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool { client })
    }

    async fn get_connection(&self) -> CacheResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(CacheError::Connection)
    }

    /// Set a key-value pair in Redis with optional TTL
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;

        if let Some(ttl) = ttl_seconds {
            let _: () = conn
                .set_ex(key, value, ttl)
                .await
                .map_err(CacheError::Command)?;
        } else {
            let _: () = conn.set(key, value).await.map_err(CacheError::Command)?;
        }

        Ok(())
    }

    /// Get a value from Redis by key
    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = conn.get(key).await.map_err(CacheError::Command)?;
        Ok(value)
    }

    /// Delete a key from Redis
    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;
        let _: u64 = conn.del(key).await.map_err(CacheError::Command)?;
        Ok(())
    }

    /// Set `key` with a TTL and record it in the `index` set, atomically.
    ///
    /// The index TTL is pushed forward to the TTL of its newest member.
    pub async fn set_indexed(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
        index: &str,
    ) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;

        let _: () = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .ignore()
            .cmd("SADD")
            .arg(index)
            .arg(key)
            .ignore()
            .cmd("EXPIRE")
            .arg(index)
            .arg(ttl_seconds)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;

        Ok(())
    }

    /// Delete `key` and remove it from the `index` set, atomically.
    pub async fn delete_indexed(&self, key: &str, index: &str) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;

        let _: () = redis::pipe()
            .atomic()
            .cmd("DEL")
            .arg(key)
            .ignore()
            .cmd("SREM")
            .arg(index)
            .arg(key)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;

        Ok(())
    }

    /// Delete every key recorded in `index` along with the index itself.
    ///
    /// Returns the number of keys that were tracked by the index.
    pub async fn delete_all_indexed(&self, index: &str) -> CacheResult<u64> {
        let mut conn = self.get_connection().await?;

        let removed: u64 = Script::new(DELETE_INDEXED_SCRIPT)
            .key(index)
            .invoke_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;

        Ok(removed)
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> CacheResult<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;
        Ok(pong == "PONG")
    }
}
