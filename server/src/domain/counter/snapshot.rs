//! Live snapshot cache
//!
//! Get-or-backfill over the shared cache backend. A snapshot freezes the
//! legacy baseline for a metric so each event costs one legacy lookup at most
//! per TTL period.

use std::sync::Arc;
use std::time::Duration;

use super::normalize::PageTarget;
use crate::data::cache::{CacheError, CacheKey, CacheService, Metric};
use crate::domain::legacy::BaselineSource;

pub struct SnapshotCache {
    cache: Arc<CacheService>,
    source: Arc<dyn BaselineSource>,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(cache: Arc<CacheService>, source: Arc<dyn BaselineSource>, ttl: Duration) -> Self {
        Self { cache, source, ttl }
    }

    /// Cached baseline, backfilled from the legacy source on miss
    ///
    /// A failed backfill stores 0 so the next request does not retry until
    /// the snapshot expires.
    pub async fn get(&self, metric: Metric, target: &PageTarget) -> Result<u64, CacheError> {
        let key = CacheKey::snapshot(metric, &target.host, &target.path);
        if let Some(value) = self.cache.get::<u64>(&key).await? {
            return Ok(value);
        }

        let value = self.source.backfill(target, metric).await;
        self.cache.set(&key, &value, Some(self.ttl)).await?;
        tracing::debug!(key = %key, value, "Stored snapshot");
        Ok(value)
    }

    /// Cached baseline without backfilling
    pub async fn peek(
        &self,
        metric: Metric,
        host: &str,
        path: &str,
    ) -> Result<Option<u64>, CacheError> {
        self.cache
            .get(&CacheKey::snapshot(metric, host, path))
            .await
    }

    /// Overwrite the snapshot (administrative baseline correction)
    pub async fn set(
        &self,
        metric: Metric,
        host: &str,
        path: &str,
        value: u64,
    ) -> Result<(), CacheError> {
        self.cache
            .set(&CacheKey::snapshot(metric, host, path), &value, Some(self.ttl))
            .await
    }
}
