//! Cache key builder
//!
//! Every key the service writes is built here so the layout stays in one place.

use std::fmt;

/// Metric kinds that carry a legacy snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    SitePv,
    SiteUv,
    PagePv,
}

impl Metric {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Metric::SitePv => "site_pv",
            Metric::SiteUv => "site_uv",
            Metric::PagePv => "page_pv",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct CacheKey;

impl CacheKey {
    // =========================================================================
    // Counters
    // =========================================================================

    pub fn site_views(host: &str) -> String {
        format!("pv:site:{}", host)
    }

    pub fn page_views(host: &str, path: &str) -> String {
        format!("pv:page:{}:{}", host, path)
    }

    /// Visitor identity set for a host
    pub fn visitors(host: &str) -> String {
        format!("uv:site:{}", host)
    }

    /// Manual UV adjustment for a host
    pub fn visitor_adjustment(host: &str) -> String {
        format!("uv:adjust:{}", host)
    }

    // =========================================================================
    // Legacy snapshots
    // =========================================================================

    /// Snapshot key. Only page-level metrics carry a path.
    pub fn snapshot(metric: Metric, host: &str, path: &str) -> String {
        match metric {
            Metric::PagePv => format!("live:{}:{}:{}", metric, host, path),
            Metric::SitePv | Metric::SiteUv => format!("live:{}:{}", metric, host),
        }
    }

    // =========================================================================
    // Domain records
    // =========================================================================

    /// Cached domain record (or its absence)
    pub fn domain(host: &str) -> String {
        format!("domain:{}", host)
    }

    // =========================================================================
    // Rate Limiting
    // =========================================================================

    pub fn rate_limit(bucket: &str, identifier: &str) -> String {
        format!("rl:{}:{}", bucket, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_keys() {
        assert_eq!(CacheKey::site_views("a.com"), "pv:site:a.com");
        assert_eq!(CacheKey::page_views("a.com", "/x"), "pv:page:a.com:/x");
        assert_eq!(CacheKey::visitors("a.com"), "uv:site:a.com");
        assert_eq!(CacheKey::visitor_adjustment("a.com"), "uv:adjust:a.com");
    }

    #[test]
    fn test_snapshot_keys() {
        assert_eq!(
            CacheKey::snapshot(Metric::PagePv, "a.com", "/x"),
            "live:page_pv:a.com:/x"
        );
        assert_eq!(
            CacheKey::snapshot(Metric::SitePv, "a.com", "/x"),
            "live:site_pv:a.com"
        );
        assert_eq!(
            CacheKey::snapshot(Metric::SiteUv, "a.com", "/ignored"),
            "live:site_uv:a.com"
        );
    }

    #[test]
    fn test_domain_key() {
        assert_eq!(CacheKey::domain("a.com"), "domain:a.com");
    }

    #[test]
    fn test_rate_limit_key() {
        assert_eq!(
            CacheKey::rate_limit("log", "203.0.113.9"),
            "rl:log:203.0.113.9"
        );
    }
}
