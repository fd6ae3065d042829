//! Key-value cache used for single-task lookups.
//!
//! Values are stored as JSON strings under `todo:{id}` keys with a fixed
//! expiration. Only point lookups go through the cache; lists never do.

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use std::time::Duration;

/// Namespace prefix for cached task keys.
pub const CACHE_KEY_PREFIX: &str = "todo:";

/// Expiration applied to every cached task.
pub const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Builds the cache key for a task from its raw identifier string.
pub fn todo_key(id: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{id}")
}

/// Error type for cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The connection pool could not be created from the configured address.
    #[error("Failed to create cache pool: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),
    /// No connection could be checked out of the pool.
    #[error("Cache connection error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),
    /// The cache server rejected or failed the command.
    #[error("Cache error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Get/set access to the task cache.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TodoCache: Send + Sync {
    /// Fetches the value stored under `key`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` on a miss, `Ok(Some(value))` on a hit, or an error if the cache could not be reached.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Redis implementation of `TodoCache` backed by a `deadpool-redis` pool.
#[derive(Clone)]
pub struct RedisTodoCache {
    pool: Pool,
}

impl RedisTodoCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates a cache from a Redis URL such as `redis://localhost:6379`.
    pub fn from_url(redis_url: &str) -> Result<Self, CacheError> {
        let pool = Config::from_url(redis_url).create_pool(Some(Runtime::Tokio1))?;
        Ok(Self { pool })
    }

    /// Checks that the cache server answers.
    #[tracing::instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut connection = self.pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut *connection).await?;
        Ok(())
    }
}

#[async_trait]
impl TodoCache for RedisTodoCache {
    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut connection = self.pool.get().await?;
        let value: Option<String> = connection.get(key).await?;
        Ok(value)
    }

    #[tracing::instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut connection = self.pool.get().await?;
        let _: () = connection.set_ex(key, value, ttl.as_secs()).await?;
        Ok(())
    }
}
