//! Admin API types

use serde::Deserialize;
use validator::Validate;

use crate::domain::counter::{CounterOverwrite, PageOverwrite};

/// Body of `PUT /api/v1/admin/domains/{host}`
#[derive(Debug, Deserialize, Validate)]
pub struct TrackDomainRequest {
    pub verified: bool,
    pub tracked: bool,
}

/// Page counter entry in an overwrite request
#[derive(Debug, Deserialize, Validate)]
pub struct PageViewsBody {
    #[validate(length(min = 1, max = 2048, message = "path must be 1-2048 characters"))]
    pub path: String,
    pub views: u64,
}

/// Body of `PUT /api/v1/admin/domains/{host}/counters`
#[derive(Debug, Deserialize, Validate)]
pub struct OverwriteCountersRequest {
    pub site_pv: Option<u64>,
    #[validate(nested)]
    pub page: Option<PageViewsBody>,
    pub uv_adjustment: Option<i64>,
    /// Replace the cached legacy site PV baseline
    pub baseline_site_pv: Option<u64>,
    /// Replace the cached legacy site UV baseline
    pub baseline_site_uv: Option<u64>,
    /// Replace the cached legacy baseline of one page
    #[validate(nested)]
    pub page_baseline: Option<PageViewsBody>,
}

impl OverwriteCountersRequest {
    pub fn is_empty(&self) -> bool {
        self.site_pv.is_none()
            && self.page.is_none()
            && self.uv_adjustment.is_none()
            && self.baseline_site_pv.is_none()
            && self.baseline_site_uv.is_none()
            && self.page_baseline.is_none()
    }
}

impl From<PageViewsBody> for PageOverwrite {
    fn from(page: PageViewsBody) -> Self {
        Self {
            path: page.path,
            views: page.views,
        }
    }
}

impl From<OverwriteCountersRequest> for CounterOverwrite {
    fn from(req: OverwriteCountersRequest) -> Self {
        Self {
            site_pv: req.site_pv,
            page: req.page.map(PageOverwrite::from),
            uv_adjustment: req.uv_adjustment,
            baseline_site_pv: req.baseline_site_pv,
            baseline_site_uv: req.baseline_site_uv,
            page_baseline: req.page_baseline.map(PageOverwrite::from),
        }
    }
}
