//! Fire-and-forget replication of admitted events to the legacy provider

use reqwest::header::REFERER;
use tokio::task::JoinHandle;

use super::LegacyClient;
use super::LegacyError;

/// Forwards each counted page view to the legacy provider
///
/// The provider counts the hit itself from the `Referer`; the response body
/// is ignored. Results are only logged.
#[derive(Clone)]
pub struct LegacySync {
    http: reqwest::Client,
    url: String,
    enabled: bool,
}

impl LegacySync {
    pub fn new(client: &LegacyClient, url: &str, sync_back: bool) -> Self {
        Self {
            http: client.http_client(),
            url: url.to_string(),
            enabled: sync_back && client.is_enabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Spawn a detached notification for `page_url`
    ///
    /// Returns the task handle so callers may await it; the counting path
    /// drops it.
    pub fn notify(&self, page_url: &str) -> Option<JoinHandle<()>> {
        if !self.enabled {
            return None;
        }

        let http = self.http.clone();
        let url = self.url.clone();
        let page_url = page_url.to_string();

        Some(tokio::spawn(async move {
            match send(&http, &url, &page_url).await {
                Ok(()) => tracing::debug!(page = %page_url, "Legacy sync-back sent"),
                Err(e) => tracing::warn!(page = %page_url, error = %e, "Legacy sync-back failed"),
            }
        }))
    }
}

async fn send(http: &reqwest::Client, url: &str, page_url: &str) -> Result<(), LegacyError> {
    let resp = http.get(url).header(REFERER, page_url).send().await?;
    if !resp.status().is_success() {
        return Err(LegacyError::Status(resp.status().as_u16()));
    }
    Ok(())
}
