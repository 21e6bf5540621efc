//! Counter aggregation service
//!
//! Composes legacy baselines with live counters. For each metric the
//! snapshot read and the counter write run concurrently; the reported total
//! is `baseline + live`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::normalize::{
    PageTarget, UrlError, normalize_host, normalize_path_with_limit, parse_page_url,
};
use super::snapshot::SnapshotCache;
use super::store::CounterStore;
use crate::core::config::CounterConfig;
use crate::data::DataError;
use crate::data::cache::{CacheError, Metric};
use crate::data::types::DomainRow;
use crate::domain::legacy::LegacySync;

#[derive(Error, Debug)]
pub enum CounterError {
    #[error(transparent)]
    InvalidUrl(#[from] UrlError),

    #[error(transparent)]
    Data(#[from] DataError),
}

impl From<CacheError> for CounterError {
    fn from(e: CacheError) -> Self {
        Self::Data(DataError::Cache(e))
    }
}

/// Totals reported to the embedding page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub site_uv: u64,
    pub site_pv: u64,
    pub page_pv: u64,
}

/// Live counters and baselines for one host (admin view)
#[derive(Debug, Clone, Serialize)]
pub struct DomainReport {
    pub host: String,
    pub domain: Option<DomainRow>,
    pub site_pv: u64,
    pub visitors: u64,
    pub uv_adjustment: i64,
    pub baseline_site_pv: Option<u64>,
    pub baseline_site_uv: Option<u64>,
}

/// Page counter overwrite
#[derive(Debug, Clone, Deserialize)]
pub struct PageOverwrite {
    pub path: String,
    pub views: u64,
}

/// Administrative counter overwrite; absent fields are left unchanged
///
/// `baseline_*` and `page_baseline` replace cached legacy snapshots, e.g. a
/// zero stored after the legacy provider was unreachable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CounterOverwrite {
    pub site_pv: Option<u64>,
    pub page: Option<PageOverwrite>,
    pub uv_adjustment: Option<i64>,
    pub baseline_site_pv: Option<u64>,
    pub baseline_site_uv: Option<u64>,
    pub page_baseline: Option<PageOverwrite>,
}

pub struct CounterService {
    snapshots: SnapshotCache,
    store: CounterStore,
    sync: Option<LegacySync>,
    path_max_len: usize,
    require_tracked_domain: bool,
}

impl CounterService {
    pub fn new(
        snapshots: SnapshotCache,
        store: CounterStore,
        sync: Option<LegacySync>,
        config: &CounterConfig,
    ) -> Self {
        Self {
            snapshots,
            store,
            sync,
            path_max_len: config.path_max_len,
            require_tracked_domain: config.require_tracked_domain,
        }
    }

    /// Count one page view by `visitor_id` and return the new totals
    ///
    /// URLs that cannot be counted return zeros without touching any counter.
    pub async fn record(&self, url: &str, visitor_id: &str) -> Result<Totals, CounterError> {
        let Some(target) = self.resolve(url).await? else {
            return Ok(Totals::default());
        };

        let (site_uv, site_pv, page_pv) = tokio::try_join!(
            self.record_visitor(&target, visitor_id),
            self.record_site_view(&target),
            self.record_page_view(&target),
        )?;

        if let Some(sync) = &self.sync {
            // Detached; the response never waits for the legacy provider
            let _ = sync.notify(url);
        }

        Ok(Totals {
            site_uv,
            site_pv,
            page_pv,
        })
    }

    /// Current totals without counting
    pub async fn read(&self, url: &str) -> Result<Totals, CounterError> {
        let Some(target) = self.resolve(url).await? else {
            return Ok(Totals::default());
        };

        let (site_uv, site_pv, page_pv) = tokio::try_join!(
            self.read_visitors(&target),
            self.read_site_views(&target),
            self.read_page_views(&target),
        )?;

        Ok(Totals {
            site_uv,
            site_pv,
            page_pv,
        })
    }

    async fn resolve(&self, url: &str) -> Result<Option<PageTarget>, CounterError> {
        let Some(target) = parse_page_url(url, self.path_max_len)? else {
            tracing::debug!(url, "Unsupported page URL, returning zeros");
            return Ok(None);
        };

        if self.require_tracked_domain && !self.store.domains().is_tracked(&target.host).await? {
            tracing::debug!(host = %target.host, "Host not tracked, returning zeros");
            return Ok(None);
        }

        Ok(Some(target))
    }

    // =========================================================================
    // Write path
    // =========================================================================

    async fn record_visitor(
        &self,
        target: &PageTarget,
        visitor_id: &str,
    ) -> Result<u64, CounterError> {
        let (before, after) = tokio::join!(self.snapshots.get(Metric::SiteUv, target), async {
            let (cardinality, adjustment) = tokio::try_join!(
                self.store.register_visitor(&target.host, visitor_id),
                self.store.unique_visitor_adjustment(&target.host),
            )?;
            Ok::<_, DataError>(visitor_total(cardinality, adjustment))
        });
        Ok(with_baseline(before?, after?))
    }

    async fn record_site_view(&self, target: &PageTarget) -> Result<u64, CounterError> {
        let (before, after) = tokio::join!(
            self.snapshots.get(Metric::SitePv, target),
            self.store.increment_site_view(&target.host),
        );
        Ok(with_baseline(before?, i64_of(after?)))
    }

    async fn record_page_view(&self, target: &PageTarget) -> Result<u64, CounterError> {
        let (before, after) = tokio::join!(
            self.snapshots.get(Metric::PagePv, target),
            self.store.increment_page_view(&target.host, &target.path),
        );
        Ok(with_baseline(before?, i64_of(after?)))
    }

    // =========================================================================
    // Read path
    // =========================================================================

    async fn read_visitors(&self, target: &PageTarget) -> Result<u64, CounterError> {
        let (before, after) = tokio::join!(self.snapshots.get(Metric::SiteUv, target), async {
            let (cardinality, adjustment) = tokio::try_join!(
                self.store.unique_visitors(&target.host),
                self.store.unique_visitor_adjustment(&target.host),
            )?;
            Ok::<_, DataError>(visitor_total(cardinality, adjustment))
        });
        Ok(with_baseline(before?, after?))
    }

    async fn read_site_views(&self, target: &PageTarget) -> Result<u64, CounterError> {
        let (before, after) = tokio::join!(
            self.snapshots.get(Metric::SitePv, target),
            self.store.site_views(&target.host),
        );
        Ok(with_baseline(before?, i64_of(after?)))
    }

    async fn read_page_views(&self, target: &PageTarget) -> Result<u64, CounterError> {
        let (before, after) = tokio::join!(
            self.snapshots.get(Metric::PagePv, target),
            self.store.page_views(&target.host, &target.path),
        );
        Ok(with_baseline(before?, i64_of(after?)))
    }

    // =========================================================================
    // Administration
    // =========================================================================

    /// Domain record, live counters and cached baselines for a host
    pub async fn report(&self, host: &str) -> Result<DomainReport, CounterError> {
        let host = normalize_host(host);
        let (domain, site_pv, visitors, uv_adjustment) = tokio::try_join!(
            self.store.domains().get_domain(&host),
            self.store.site_views(&host),
            self.store.unique_visitors(&host),
            self.store.unique_visitor_adjustment(&host),
        )?;
        let (baseline_site_pv, baseline_site_uv) = tokio::try_join!(
            self.snapshots.peek(Metric::SitePv, &host, "/"),
            self.snapshots.peek(Metric::SiteUv, &host, "/"),
        )?;

        Ok(DomainReport {
            host,
            domain,
            site_pv,
            visitors,
            uv_adjustment,
            baseline_site_pv,
            baseline_site_uv,
        })
    }

    /// Register or update the tracking flags of a host
    pub async fn track(
        &self,
        host: &str,
        verified: bool,
        tracked: bool,
    ) -> Result<DomainRow, CounterError> {
        let host = normalize_host(host);
        let row = self
            .store
            .domains()
            .upsert_domain(&host, verified, tracked)
            .await?;
        tracing::info!(host = %host, verified, tracked, "Updated domain tracking");
        Ok(row)
    }

    /// Apply an administrative overwrite
    pub async fn overwrite(
        &self,
        host: &str,
        overwrite: CounterOverwrite,
    ) -> Result<(), CounterError> {
        let host = normalize_host(host);

        if let Some(views) = overwrite.site_pv {
            self.store.set_site_views(&host, views).await?;
        }
        if let Some(page) = overwrite.page {
            let path = normalize_path_with_limit(&page.path, self.path_max_len);
            self.store.set_page_views(&host, &path, page.views).await?;
        }
        if let Some(delta) = overwrite.uv_adjustment {
            self.store.set_unique_visitor_adjustment(&host, delta).await?;
        }
        if let Some(value) = overwrite.baseline_site_pv {
            self.snapshots.set(Metric::SitePv, &host, "/", value).await?;
        }
        if let Some(value) = overwrite.baseline_site_uv {
            self.snapshots.set(Metric::SiteUv, &host, "/", value).await?;
        }
        if let Some(page) = overwrite.page_baseline {
            let path = normalize_path_with_limit(&page.path, self.path_max_len);
            self.snapshots
                .set(Metric::PagePv, &host, &path, page.views)
                .await?;
        }

        tracing::info!(host = %host, "Applied counter overwrite");
        Ok(())
    }
}

/// Live UV: set cardinality plus the signed manual adjustment
fn visitor_total(cardinality: u64, adjustment: i64) -> i64 {
    i64_of(cardinality).saturating_add(adjustment)
}

/// Baseline plus live count, never negative
fn with_baseline(before: u64, after: i64) -> u64 {
    let total = i64_of(before).saturating_add(after);
    u64::try_from(total).unwrap_or(0)
}

fn i64_of(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
