//! Cache backend trait definition

use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheError;

/// Outcome of one sliding-window admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOutcome {
    /// Whether this hit was recorded in the window
    pub admitted: bool,
    /// Hits in the window after this attempt
    pub count: u64,
    /// Timestamp (ms) of the oldest hit still in the window
    pub oldest_ms: Option<u64>,
}

/// Cache backend trait
///
/// Both in-memory and Redis backends implement this trait. Every mutating
/// operation is atomic on its key: callers never read-modify-write.
///
/// Every write takes a TTL and refreshes it, so entries touched by live
/// traffic keep living while abandoned ones expire.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value from the cache
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Set a value in the cache with optional TTL
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
    -> Result<(), CacheError>;

    /// Delete a key from the cache
    ///
    /// Returns `true` if the key existed before deletion.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Atomic increment, creating the counter at 1. The TTL is refreshed on every call.
    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, CacheError>;

    /// Get the current counter value without incrementing
    async fn get_counter(&self, key: &str) -> Result<Option<i64>, CacheError>;

    /// Overwrite a counter with an absolute value
    async fn set_counter(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError>;

    /// Add `member` to the set at `key` and return the resulting cardinality
    ///
    /// Adding an existing member leaves the cardinality unchanged.
    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<u64, CacheError>;

    /// Cardinality of the set at `key` (0 when missing)
    async fn set_card(&self, key: &str) -> Result<u64, CacheError>;

    /// Refresh the TTL of an existing key. Returns `false` if the key is missing.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;

    /// Sliding-window log admission
    ///
    /// Drops hits older than `now_ms - window_ms`, then records a hit at
    /// `now_ms` only if fewer than `limit` remain. Rejected attempts are not
    /// recorded.
    async fn sliding_window(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
        limit: u64,
    ) -> Result<WindowOutcome, CacheError>;

    /// Get the TTL remaining for a key
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;

    /// Health check (validates connection)
    async fn health_check(&self) -> Result<(), CacheError>;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}
