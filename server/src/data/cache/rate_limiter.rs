//! Rate limiter using the cache backend
//!
//! Implements a sliding-window log: every admitted request is recorded with
//! its timestamp and a request is admitted only while fewer than `limit`
//! hits remain inside the trailing window. Unlike fixed windows there is no
//! burst of 2x the limit at window boundaries.
//!
//! Rejected requests are not recorded, so a client hammering the endpoint
//! regains capacity as soon as its oldest admitted hit ages out.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use super::CacheService;
use super::key::CacheKey;

/// Rate limit bucket configuration
#[derive(Debug, Clone)]
pub struct RateLimitBucket {
    /// Bucket name, part of the cache key
    pub name: &'static str,
    /// Maximum admitted requests per window
    pub requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl RateLimitBucket {
    /// Bucket guarding the counting endpoints
    pub fn counting(requests: u32, window_secs: u64) -> Self {
        Self {
            name: "log",
            requests,
            window_secs,
        }
    }

    fn window_ms(&self) -> u64 {
        self.window_secs.saturating_mul(1000)
    }
}

/// Rate limit check result
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Requests remaining in the current window
    pub remaining: u32,
    pub limit: u32,
    /// Unix timestamp (seconds) when the oldest hit leaves the window
    pub reset_at: u64,
    /// Seconds until retry (only if blocked)
    pub retry_after: Option<u64>,
}

pub struct RateLimiter {
    cache: Arc<CacheService>,
}

impl RateLimiter {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self { cache }
    }

    /// Check and record a request for `identifier` in `bucket`
    pub async fn check(&self, bucket: &RateLimitBucket, identifier: &str) -> RateLimitResult {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "System clock is before UNIX epoch");
                0
            });
        self.check_at(bucket, identifier, now_ms).await
    }

    pub(crate) async fn check_at(
        &self,
        bucket: &RateLimitBucket,
        identifier: &str,
        now_ms: u64,
    ) -> RateLimitResult {
        let key = CacheKey::rate_limit(bucket.name, identifier);
        let limit = bucket.requests;
        let window_ms = bucket.window_ms();

        let outcome = match self
            .cache
            .sliding_window(&key, now_ms, window_ms, u64::from(limit))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                // Fail open on cache outage
                tracing::warn!(
                    bucket = bucket.name,
                    client = %identifier,
                    error = %e,
                    "Rate limit window update failed, allowing request"
                );
                return RateLimitResult {
                    allowed: true,
                    remaining: limit.saturating_sub(1),
                    limit,
                    reset_at: (now_ms + window_ms) / 1000,
                    retry_after: None,
                };
            }
        };

        let remaining = u64::from(limit)
            .saturating_sub(outcome.count)
            .try_into()
            .unwrap_or(0u32);
        let reset_ms = outcome.oldest_ms.unwrap_or(now_ms).saturating_add(window_ms);

        tracing::trace!(
            bucket = bucket.name,
            client = %identifier,
            count = outcome.count,
            limit,
            allowed = outcome.admitted,
            "Rate limit check"
        );

        RateLimitResult {
            allowed: outcome.admitted,
            remaining,
            limit,
            reset_at: reset_ms.div_ceil(1000),
            retry_after: if outcome.admitted {
                None
            } else {
                Some(reset_ms.saturating_sub(now_ms).div_ceil(1000).max(1))
            },
        }
    }
}
