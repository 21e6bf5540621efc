//! Legacy provider backfill client

use async_trait::async_trait;
use reqwest::header::REFERER;

use super::LegacyError;
use super::payload::{Framing, LegacyCounts};
use crate::core::config::LegacyConfig;
use crate::core::constants::LEGACY_USER_AGENT;
use crate::data::cache::Metric;
use crate::domain::counter::normalize::PageTarget;
use crate::utils::retry::RetryPolicy;

/// Source of baseline counts for a metric that has no snapshot yet
///
/// Implementations never fail: an unreachable source yields 0.
#[async_trait]
pub trait BaselineSource: Send + Sync {
    async fn backfill(&self, target: &PageTarget, metric: Metric) -> u64;
}

/// HTTP client for the legacy counting provider
pub struct LegacyClient {
    http: reqwest::Client,
    url: String,
    enabled: bool,
    retry: RetryPolicy,
    framing: Framing,
}

impl LegacyClient {
    pub fn new(config: &LegacyConfig) -> Result<Self, LegacyError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(LEGACY_USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            url: config.url.clone(),
            enabled: config.enabled,
            retry: RetryPolicy::fixed(config.max_attempts, config.retry_delay),
            framing: Framing {
                prefix_len: config.prefix_len,
                suffix_len: config.suffix_len,
            },
        })
    }

    /// Shared HTTP client (connection pool reused by sync-back)
    pub fn http_client(&self) -> reqwest::Client {
        self.http.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fetch counts for one referer, retrying per the configured policy
    pub async fn fetch(&self, referer: &str) -> Result<LegacyCounts, LegacyError> {
        match self.retry.run(|_| self.fetch_once(referer)).await {
            Ok((counts, attempt)) => {
                tracing::debug!(referer, attempt, "Legacy fetch succeeded");
                Ok(counts)
            }
            Err((e, attempt)) => {
                tracing::warn!(referer, attempt, error = %e, "Legacy fetch failed");
                Err(e)
            }
        }
    }

    async fn fetch_once(&self, referer: &str) -> Result<LegacyCounts, LegacyError> {
        let resp = self
            .http
            .get(&self.url)
            .header(REFERER, referer)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(LegacyError::Status(resp.status().as_u16()));
        }

        let body = resp.bytes().await?;
        self.framing.parse(&body)
    }

    /// Page PV is looked up with and without a trailing slash; the provider
    /// keys them separately and either may hold the history.
    async fn page_views(&self, target: &PageTarget) -> Option<u64> {
        let bare = target.referer(false);
        let slashed = target.referer(true);
        let (bare, slashed) = tokio::join!(self.fetch(&bare), self.fetch(&slashed));

        match (bare, slashed) {
            (Err(_), Err(_)) => None,
            (bare, slashed) => {
                let bare = bare.map_or(0, |c| c.page_pv);
                let slashed = slashed.map_or(0, |c| c.page_pv);
                Some(bare.max(slashed))
            }
        }
    }
}

#[async_trait]
impl BaselineSource for LegacyClient {
    async fn backfill(&self, target: &PageTarget, metric: Metric) -> u64 {
        if !self.enabled {
            return 0;
        }

        let value = match metric {
            Metric::PagePv => self.page_views(target).await,
            Metric::SitePv => self
                .fetch(&target.referer(false))
                .await
                .ok()
                .map(|c| c.site_pv),
            Metric::SiteUv => self
                .fetch(&target.referer(false))
                .await
                .ok()
                .map(|c| c.site_uv),
        };

        match value {
            Some(value) => {
                tracing::debug!(
                    host = %target.host,
                    path = %target.path,
                    metric = %metric,
                    value,
                    "Backfilled baseline"
                );
                value
            }
            None => {
                tracing::warn!(
                    host = %target.host,
                    path = %target.path,
                    metric = %metric,
                    "Legacy backfill exhausted retries, using 0"
                );
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use httpmock::prelude::*;

    use crate::core::constants::LEGACY_PAYLOAD_TRAILER;

    fn body(site_uv: u64, site_pv: u64, page_pv: u64) -> String {
        format!(
            "try{{BusuanziCallback_777487655111({{\"site_uv\":{},\"page_pv\":{},\"version\":2.4,\"site_pv\":{}}}{}",
            site_uv, page_pv, site_pv, LEGACY_PAYLOAD_TRAILER
        )
    }

    fn client(server: &MockServer, enabled: bool) -> LegacyClient {
        let config = LegacyConfig {
            enabled,
            url: server.url("/busuanzi"),
            max_attempts: 3,
            retry_delay: Duration::from_millis(5),
            timeout: Duration::from_secs(5),
            ..LegacyConfig::default()
        };
        LegacyClient::new(&config).unwrap()
    }

    fn target(path: &str) -> PageTarget {
        PageTarget {
            host: "a.com".to_string(),
            path: path.to_string(),
            origin: "https://a.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_backfill_site_metrics() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/busuanzi")
                    .header("referer", "https://a.com/x");
                then.status(200).body(body(10, 20, 5));
            })
            .await;

        let client = client(&server, true);
        assert_eq!(client.backfill(&target("/x"), Metric::SiteUv).await, 10);
        assert_eq!(client.backfill(&target("/x"), Metric::SitePv).await, 20);
        mock.assert_calls_async(2).await;
    }

    #[tokio::test]
    async fn test_backfill_page_takes_max_of_both_referers() {
        let server = MockServer::start_async().await;
        let bare = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/busuanzi")
                    .header("referer", "https://a.com/x");
                then.status(200).body(body(10, 20, 5));
            })
            .await;
        let slashed = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/busuanzi")
                    .header("referer", "https://a.com/x/");
                then.status(200).body(body(10, 20, 8));
            })
            .await;

        let client = client(&server, true);
        assert_eq!(client.backfill(&target("/x"), Metric::PagePv).await, 8);
        bare.assert_calls_async(1).await;
        slashed.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn test_backfill_page_uses_the_successful_referer() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/busuanzi")
                    .header("referer", "https://a.com/x");
                then.status(200).body(body(10, 20, 5));
            })
            .await;
        let slashed = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/busuanzi")
                    .header("referer", "https://a.com/x/");
                then.status(502);
            })
            .await;

        let client = client(&server, true);
        assert_eq!(client.backfill(&target("/x"), Metric::PagePv).await, 5);
        slashed.assert_calls_async(3).await;
    }

    #[tokio::test]
    async fn test_backfill_all_attempts_fail_returns_zero() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/busuanzi");
                then.status(500);
            })
            .await;

        let client = client(&server, true);
        assert_eq!(client.backfill(&target("/x"), Metric::SitePv).await, 0);
        mock.assert_calls_async(3).await;
    }

    #[tokio::test]
    async fn test_backfill_malformed_payload_returns_zero() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/busuanzi");
                then.status(200).body("<html>maintenance</html>");
            })
            .await;

        let client = client(&server, true);
        assert_eq!(client.backfill(&target("/"), Metric::SiteUv).await, 0);
        mock.assert_calls_async(3).await;
    }

    #[tokio::test]
    async fn test_backfill_disabled_skips_network() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/busuanzi");
                then.status(200).body(body(10, 20, 5));
            })
            .await;

        let client = client(&server, false);
        assert!(!client.is_enabled());
        assert_eq!(client.backfill(&target("/x"), Metric::PagePv).await, 0);
        mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_user_agent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/busuanzi")
                    .header("user-agent", LEGACY_USER_AGENT);
                then.status(200).body(body(1, 2, 3));
            })
            .await;

        let client = client(&server, true);
        let counts = client.fetch("https://a.com/").await.unwrap();
        assert_eq!(counts.page_pv, 3);
        mock.assert_calls_async(1).await;
    }
}
