//! Cache module
//!
//! Shared key/value substrate for counters, visitor sets, legacy snapshots
//! and rate-limit windows, with pluggable backends:
//! - In-memory (default) - uses moka + dashmap
//! - Redis - uses deadpool-redis, shared by every service instance

mod backend;
mod error;
mod key;
mod memory;
pub mod rate_limiter;
mod redis;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use backend::{CacheBackend, WindowOutcome};
pub use error::CacheError;
pub use key::{CacheKey, Metric};
pub use rate_limiter::{RateLimitBucket, RateLimitResult, RateLimiter};

use memory::InMemoryCache;

use crate::core::config::{CacheBackendType, CacheConfig};

/// Cache service providing typed access to the cache backend
///
/// Byte values go through MessagePack; counters, sets and windows map
/// directly onto the backend's atomic primitives.
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

impl CacheService {
    /// Create a new cache service from configuration
    pub async fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let backend: Arc<dyn CacheBackend> = match config.backend {
            CacheBackendType::Memory => {
                tracing::debug!(max_entries = config.max_entries, "Initializing in-memory cache");
                Arc::new(InMemoryCache::new(config))
            }
            CacheBackendType::Redis => {
                let url = config.redis_url.as_ref().ok_or_else(|| {
                    CacheError::Config("redis_url required for Redis backend".into())
                })?;
                Arc::new(redis::RedisCache::new(url).await?)
            }
        };

        Ok(Self { backend })
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    // =========================================================================
    // Typed API (serde)
    // =========================================================================

    /// Get a typed value from cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.backend.get(key).await? {
            Some(bytes) => {
                let value = rmp_serde::from_slice(&bytes)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Set a typed value in cache
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let bytes =
            rmp_serde::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.backend.set(key, bytes, ttl).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.backend.delete(key).await
    }

    // =========================================================================
    // Counters and sets
    // =========================================================================

    /// Atomic increment, refreshing the TTL
    pub async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        self.backend.incr(key, ttl).await
    }

    pub async fn get_counter(&self, key: &str) -> Result<Option<i64>, CacheError> {
        self.backend.get_counter(key).await
    }

    pub async fn set_counter(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError> {
        self.backend.set_counter(key, value, ttl).await
    }

    /// Add a set member, returning the cardinality after the add
    pub async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<u64, CacheError> {
        self.backend.set_add(key, member, ttl).await
    }

    pub async fn set_card(&self, key: &str) -> Result<u64, CacheError> {
        self.backend.set_card(key).await
    }

    /// Refresh the TTL of an existing key
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        self.backend.expire(key, ttl).await
    }

    pub async fn sliding_window(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
        limit: u64,
    ) -> Result<WindowOutcome, CacheError> {
        self.backend
            .sliding_window(key, now_ms, window_ms, limit)
            .await
    }

    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        self.backend.ttl(key).await
    }

    pub async fn health_check(&self) -> Result<(), CacheError> {
        self.backend.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_service_backend_name() {
        let service = CacheService::new(&CacheConfig::memory()).await.unwrap();
        assert_eq!(service.backend_name(), "memory");
        assert!(service.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_typed_get_set() {
        let service = CacheService::new(&CacheConfig::memory()).await.unwrap();
        service
            .set("live:site_pv:a.com", &20u64, Some(Duration::from_secs(60)))
            .await
            .unwrap();
        let fetched: Option<u64> = service.get("live:site_pv:a.com").await.unwrap();
        assert_eq!(fetched, Some(20));

        let missing: Option<u64> = service.get("live:site_pv:b.com").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_typed_get_wrong_shape() {
        let service = CacheService::new(&CacheConfig::memory()).await.unwrap();
        service.set("k", &"text", None).await.unwrap();
        let result: Result<Option<u64>, _> = service.get("k").await;
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_redis_backend_requires_url() {
        let config = CacheConfig {
            backend: CacheBackendType::Redis,
            redis_url: None,
            ..CacheConfig::memory()
        };
        let result = CacheService::new(&config).await;
        assert!(matches!(result, Err(CacheError::Config(_))));
    }
}
