//! Redis caching layer for the session list view
//!
//! The list endpoint is the only read that fans out across every record, so
//! it gets a short-TTL cache that every mutation invalidates. Keys come from
//! an explicit [`CacheKey`] scheme rather than ad hoc string constants.
//!
//! The cache is optional at runtime: [`OptionalCache`] degrades to straight
//! store reads when Redis is unavailable.

use anyhow::{Context, Result};
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::models::Session;

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,

    /// Connection pool size
    pub pool_size: usize,

    /// Session-list cache TTL in seconds (default: 30 seconds)
    pub list_ttl: u64,

    /// Key prefix for namespacing
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            list_ttl: 30,
            key_prefix: "comet".to_string(),
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            pool_size: std::env::var("REDIS_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            list_ttl: std::env::var("CACHE_LIST_TTL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            key_prefix: std::env::var("CACHE_KEY_PREFIX").unwrap_or_else(|_| "comet".to_string()),
        }
    }
}

/// Composable cache-key scheme for the session views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKey {
    /// The full session list
    SessionList,
}

impl CacheKey {
    /// Render the concrete redis key under a namespace prefix
    pub fn render(&self, prefix: &str) -> String {
        match self {
            Self::SessionList => format!("{prefix}:sessions:list"),
        }
    }
}

/// Redis cache client
pub struct Cache {
    pool: Pool,
    config: CacheConfig,
}

impl Cache {
    /// Create a new cache instance
    pub async fn new(config: &CacheConfig) -> Result<Self> {
        let pool_config = PoolConfig::from_url(&config.url);
        let pool = pool_config
            .builder()
            .map_err(|e| anyhow::anyhow!("Failed to create pool builder: {e}"))?
            .max_size(config.pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .context("Failed to create Redis connection pool")?;

        // Test connection
        let mut conn = pool.get().await.context("Failed to get Redis connection")?;
        let _: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .context("Failed to ping Redis")?;

        tracing::info!(url = %config.url, "Connected to Redis");

        Ok(Self {
            pool,
            config: config.clone(),
        })
    }

    /// Create a cache instance, returning None if Redis is unavailable
    pub async fn try_new(config: &CacheConfig) -> Option<Self> {
        match Self::new(config).await {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!(error = %e, "Redis cache unavailable, continuing without cache");
                None
            }
        }
    }

    /// Get the cached session list
    pub async fn get_session_list(&self) -> Result<Option<Vec<Session>>> {
        self.get(CacheKey::SessionList).await
    }

    /// Cache the session list with the configured TTL
    pub async fn set_session_list(&self, sessions: &[Session]) -> Result<()> {
        self.set(
            CacheKey::SessionList,
            &sessions,
            Duration::from_secs(self.config.list_ttl),
        )
        .await
    }

    /// Drop the cached session list (called on every session mutation)
    pub async fn invalidate_session_list(&self) -> Result<()> {
        self.delete(CacheKey::SessionList).await
    }

    // =========================================================================
    // Generic Operations
    // =========================================================================

    async fn get<T: DeserializeOwned>(&self, key: CacheKey) -> Result<Option<T>> {
        let mut conn = self.pool.get().await.context("Failed to get connection")?;
        let value: Option<Vec<u8>> = conn
            .get(key.render(&self.config.key_prefix))
            .await
            .context("Failed to get from cache")?;

        match value {
            Some(bytes) => {
                let decoded: T =
                    serde_json::from_slice(&bytes).context("Failed to deserialize value")?;
                Ok(Some(decoded))
            }
            None => Ok(None),
        }
    }

    async fn set<T: Serialize>(&self, key: CacheKey, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.pool.get().await.context("Failed to get connection")?;
        let bytes = serde_json::to_vec(value).context("Failed to serialize value")?;

        conn.set_ex::<_, _, ()>(key.render(&self.config.key_prefix), bytes, ttl.as_secs())
            .await
            .context("Failed to set cache")?;
        Ok(())
    }

    async fn delete(&self, key: CacheKey) -> Result<()> {
        let mut conn = self.pool.get().await.context("Failed to get connection")?;
        let _: () = conn
            .del(key.render(&self.config.key_prefix))
            .await
            .context("Failed to delete key")?;
        Ok(())
    }

    /// Check if cache is healthy
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        let result: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(result == "PONG")
    }
}

// ============================================================================
// Optional cache wrapper for graceful degradation
// ============================================================================

/// Optional cache that gracefully handles Redis unavailability.
///
/// Failed cache operations degrade to misses or no-ops; a broken cache never
/// fails a request.
pub struct OptionalCache {
    inner: Option<Cache>,
}

impl OptionalCache {
    /// Create with an optional cache
    pub fn new(cache: Option<Cache>) -> Self {
        Self { inner: cache }
    }

    /// Create from config, returning an empty cache if Redis is unavailable
    pub async fn from_config(config: &CacheConfig) -> Self {
        Self {
            inner: Cache::try_new(config).await,
        }
    }

    /// A cache that never hits, for tests and cacheless deployments
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Check if cache is available
    pub fn is_available(&self) -> bool {
        self.inner.is_some()
    }

    /// Get the cached session list
    pub async fn get_session_list(&self) -> Option<Vec<Session>> {
        match &self.inner {
            Some(cache) => cache.get_session_list().await.ok().flatten(),
            None => None,
        }
    }

    /// Cache the session list
    pub async fn set_session_list(&self, sessions: &[Session]) {
        if let Some(cache) = &self.inner {
            if let Err(e) = cache.set_session_list(sessions).await {
                tracing::warn!(error = %e, "Failed to cache session list");
            }
        }
    }

    /// Drop the cached session list
    pub async fn invalidate_session_list(&self) {
        if let Some(cache) = &self.inner {
            if let Err(e) = cache.invalidate_session_list().await {
                tracing::warn!(error = %e, "Failed to invalidate session list cache");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Session;
    use uuid::Uuid;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.list_ttl, 30);
        assert_eq!(config.key_prefix, "comet");
    }

    #[test]
    fn test_cache_key_render() {
        assert_eq!(CacheKey::SessionList.render("comet"), "comet:sessions:list");
        assert_eq!(CacheKey::SessionList.render("other"), "other:sessions:list");
    }

    #[tokio::test]
    async fn test_optional_cache_unavailable() {
        let cache = OptionalCache::disabled();
        assert!(!cache.is_available());
        assert!(cache.get_session_list().await.is_none());
        // no-ops must not panic
        cache.set_session_list(&[Session::new(Uuid::new_v4())]).await;
        cache.invalidate_session_list().await;
    }

    // Integration tests require running Redis
    #[tokio::test]
    #[ignore = "Requires running Redis"]
    async fn test_session_list_round_trip() {
        let config = CacheConfig::default();
        let cache = Cache::new(&config).await.unwrap();

        let sessions = vec![Session::new(Uuid::new_v4())];
        cache.set_session_list(&sessions).await.unwrap();

        let cached = cache.get_session_list().await.unwrap().unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id, sessions[0].id);

        cache.invalidate_session_list().await.unwrap();
        assert!(cache.get_session_list().await.unwrap().is_none());
    }
}
