//! Counter store
//!
//! Atomic counters and visitor sets on the shared cache backend. Every write
//! refreshes the TTL of the raw key and of the paired snapshot, so a live
//! entity keeps both its local count and its frozen baseline.

use std::sync::Arc;
use std::time::Duration;

use crate::data::DataError;
use crate::data::cache::{CacheKey, CacheService, Metric};
use crate::data::traits::DomainStore;

pub struct CounterStore {
    cache: Arc<CacheService>,
    domains: Arc<dyn DomainStore>,
    ttl: Duration,
}

impl CounterStore {
    pub fn new(cache: Arc<CacheService>, domains: Arc<dyn DomainStore>, ttl: Duration) -> Self {
        Self {
            cache,
            domains,
            ttl,
        }
    }

    pub fn domains(&self) -> &Arc<dyn DomainStore> {
        &self.domains
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub async fn increment_page_view(&self, host: &str, path: &str) -> Result<u64, DataError> {
        let count = self
            .cache
            .incr(&CacheKey::page_views(host, path), self.ttl)
            .await?;
        self.touch_snapshot(Metric::PagePv, host, path).await?;
        Ok(clamp(count))
    }

    pub async fn increment_site_view(&self, host: &str) -> Result<u64, DataError> {
        let count = self.cache.incr(&CacheKey::site_views(host), self.ttl).await?;
        self.touch_snapshot(Metric::SitePv, host, "/").await?;
        Ok(clamp(count))
    }

    /// Add a visitor to the host's set; returns the set cardinality
    pub async fn register_visitor(&self, host: &str, visitor_id: &str) -> Result<u64, DataError> {
        let cardinality = self
            .cache
            .set_add(&CacheKey::visitors(host), visitor_id, self.ttl)
            .await?;
        self.touch_snapshot(Metric::SiteUv, host, "/").await?;
        Ok(cardinality)
    }

    /// Overwrite the manual UV adjustment (persisted, then cached)
    pub async fn set_unique_visitor_adjustment(
        &self,
        host: &str,
        delta: i64,
    ) -> Result<(), DataError> {
        self.domains.set_uv_adjustment(host, delta).await?;
        self.cache
            .set_counter(&CacheKey::visitor_adjustment(host), delta, self.ttl)
            .await?;
        Ok(())
    }

    /// Overwrite a page counter
    pub async fn set_page_views(&self, host: &str, path: &str, value: u64) -> Result<(), DataError> {
        self.cache
            .set_counter(&CacheKey::page_views(host, path), to_i64(value), self.ttl)
            .await?;
        self.touch_snapshot(Metric::PagePv, host, path).await?;
        Ok(())
    }

    /// Overwrite a site counter
    pub async fn set_site_views(&self, host: &str, value: u64) -> Result<(), DataError> {
        self.cache
            .set_counter(&CacheKey::site_views(host), to_i64(value), self.ttl)
            .await?;
        self.touch_snapshot(Metric::SitePv, host, "/").await?;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn page_views(&self, host: &str, path: &str) -> Result<u64, DataError> {
        let count = self
            .cache
            .get_counter(&CacheKey::page_views(host, path))
            .await?;
        Ok(count.map_or(0, clamp))
    }

    pub async fn site_views(&self, host: &str) -> Result<u64, DataError> {
        let count = self.cache.get_counter(&CacheKey::site_views(host)).await?;
        Ok(count.map_or(0, clamp))
    }

    /// Visitor set cardinality
    pub async fn unique_visitors(&self, host: &str) -> Result<u64, DataError> {
        Ok(self.cache.set_card(&CacheKey::visitors(host)).await?)
    }

    /// Manual UV adjustment, read through the cache
    pub async fn unique_visitor_adjustment(&self, host: &str) -> Result<i64, DataError> {
        let key = CacheKey::visitor_adjustment(host);
        if let Some(delta) = self.cache.get_counter(&key).await? {
            return Ok(delta);
        }

        let delta = self.domains.uv_adjustment(host).await?;
        self.cache.set_counter(&key, delta, self.ttl).await?;
        Ok(delta)
    }

    async fn touch_snapshot(&self, metric: Metric, host: &str, path: &str) -> Result<(), DataError> {
        self.cache
            .expire(&CacheKey::snapshot(metric, host, path), self.ttl)
            .await?;
        Ok(())
    }
}

fn clamp(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
