//! DomainStore implementation for SQLite

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::cache::CacheService;
use crate::data::error::DataError;
use crate::data::traits::DomainStore;
use crate::data::types::DomainRow;

use super::SqliteService;
use super::repositories::domain;

/// SQLite-backed domain store with a read-through cache
pub struct SqliteDomainStore {
    db: Arc<SqliteService>,
    cache: Option<Arc<CacheService>>,
}

impl SqliteDomainStore {
    pub fn new(db: Arc<SqliteService>, cache: Option<Arc<CacheService>>) -> Self {
        Self { db, cache }
    }
}

#[async_trait]
impl DomainStore for SqliteDomainStore {
    async fn get_domain(&self, host: &str) -> Result<Option<DomainRow>, DataError> {
        domain::get_domain(self.db.pool(), self.cache.as_deref(), host)
            .await
            .map_err(Into::into)
    }

    async fn upsert_domain(
        &self,
        host: &str,
        verified: bool,
        tracked: bool,
    ) -> Result<DomainRow, DataError> {
        domain::upsert_domain(self.db.pool(), self.cache.as_deref(), host, verified, tracked)
            .await
            .map_err(Into::into)
    }

    async fn set_uv_adjustment(&self, host: &str, delta: i64) -> Result<(), DataError> {
        domain::set_uv_adjustment(self.db.pool(), self.cache.as_deref(), host, delta)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteDomainStore {
        let db = SqliteService::in_memory().await.unwrap();
        SqliteDomainStore::new(Arc::new(db), None)
    }

    #[tokio::test]
    async fn test_is_tracked_requires_both_flags() {
        let store = store().await;
        assert!(!store.is_tracked("a.com").await.unwrap());

        store.upsert_domain("a.com", true, false).await.unwrap();
        assert!(!store.is_tracked("a.com").await.unwrap());

        store.upsert_domain("a.com", true, true).await.unwrap();
        assert!(store.is_tracked("a.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_uv_adjustment_roundtrip() {
        let store = store().await;
        assert_eq!(store.uv_adjustment("a.com").await.unwrap(), 0);

        store.set_uv_adjustment("a.com", -7).await.unwrap();
        assert_eq!(store.uv_adjustment("a.com").await.unwrap(), -7);
    }
}
