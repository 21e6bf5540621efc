//! In-memory cache implementation using moka + dashmap
//!
//! Uses moka for byte values with per-entry TTL and dashmap for counters,
//! visitor sets and sliding windows, each guarded by its shard lock so every
//! operation is atomic on its key.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};

use super::backend::{CacheBackend, WindowOutcome};
use super::error::CacheError;
use crate::core::config::CacheConfig;

/// Expired entries are swept every this many mutating operations
const CLEANUP_INTERVAL_OPS: u64 = 256;

/// Cache entry with data and metadata
#[derive(Clone)]
struct CacheEntry {
    data: Vec<u8>,
    ttl: Option<Duration>,
    created_at: Instant,
}

/// Per-entry expiry tracking for variable TTLs
struct VariableTtlExpiry;

impl Expiry<String, CacheEntry> for VariableTtlExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_read(
        &self,
        _key: &String,
        _value: &CacheEntry,
        _read_at: Instant,
        duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        duration_until_expiry
    }
}

struct CounterEntry {
    count: i64,
    expires_at: Instant,
}

struct SetEntry {
    members: HashSet<String>,
    expires_at: Instant,
}

struct WindowEntry {
    hits: VecDeque<u64>,
    expires_at: Instant,
}

/// In-memory cache implementation
pub struct InMemoryCache {
    cache: Cache<String, CacheEntry>,
    counters: DashMap<String, CounterEntry>,
    sets: DashMap<String, SetEntry>,
    windows: DashMap<String, WindowEntry>,
    cleanup_ops: AtomicU64,
}

impl InMemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .initial_capacity((config.max_entries as usize / 4).min(10_000))
            .expire_after(VariableTtlExpiry)
            .build();

        Self {
            cache,
            counters: DashMap::new(),
            sets: DashMap::new(),
            windows: DashMap::new(),
            cleanup_ops: AtomicU64::new(0),
        }
    }

    /// Sweep expired dashmap entries every `CLEANUP_INTERVAL_OPS` writes
    fn maybe_cleanup(&self) {
        let ops = self.cleanup_ops.fetch_add(1, Ordering::Relaxed);
        if ops.is_multiple_of(CLEANUP_INTERVAL_OPS) {
            let now = Instant::now();
            self.counters.retain(|_, entry| now < entry.expires_at);
            self.sets.retain(|_, entry| now < entry.expires_at);
            self.windows.retain(|_, entry| now < entry.expires_at);
        }
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.cache.get(key).await.map(|entry| entry.data))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            data: value,
            ttl,
            created_at: Instant::now(),
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut existed = self.cache.remove(key).await.is_some();
        existed |= self.counters.remove(key).is_some();
        existed |= self.sets.remove(key).is_some();
        existed |= self.windows.remove(key).is_some();
        Ok(existed)
    }

    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let now = Instant::now();
        let expires_at = now + ttl;

        let count = match self.counters.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let counter = occupied.get_mut();
                if now >= counter.expires_at {
                    counter.count = 0;
                }
                counter.count += 1;
                counter.expires_at = expires_at;
                counter.count
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CounterEntry {
                    count: 1,
                    expires_at,
                });
                1
            }
        };

        self.maybe_cleanup();
        Ok(count)
    }

    async fn get_counter(&self, key: &str) -> Result<Option<i64>, CacheError> {
        Ok(self
            .counters
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.count))
    }

    async fn set_counter(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError> {
        self.counters.insert(
            key.to_string(),
            CounterEntry {
                count: value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<u64, CacheError> {
        let now = Instant::now();
        let expires_at = now + ttl;

        let cardinality = match self.sets.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let set = occupied.get_mut();
                if now >= set.expires_at {
                    set.members.clear();
                }
                set.members.insert(member.to_string());
                set.expires_at = expires_at;
                set.members.len()
            }
            Entry::Vacant(vacant) => {
                vacant.insert(SetEntry {
                    members: HashSet::from([member.to_string()]),
                    expires_at,
                });
                1
            }
        };

        self.maybe_cleanup();
        Ok(cardinality as u64)
    }

    async fn set_card(&self, key: &str) -> Result<u64, CacheError> {
        Ok(self
            .sets
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.members.len() as u64)
            .unwrap_or(0))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let now = Instant::now();

        if let Some(mut counter) = self.counters.get_mut(key)
            && now < counter.expires_at
        {
            counter.expires_at = now + ttl;
            return Ok(true);
        }

        if let Some(mut set) = self.sets.get_mut(key)
            && now < set.expires_at
        {
            set.expires_at = now + ttl;
            return Ok(true);
        }

        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let op = match existing {
                    Some(entry) => {
                        let mut entry = entry.into_value();
                        entry.ttl = Some(ttl);
                        entry.created_at = Instant::now();
                        Op::Put(entry)
                    }
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        Ok(matches!(result, CompResult::ReplacedWith(_)))
    }

    async fn sliding_window(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
        limit: u64,
    ) -> Result<WindowOutcome, CacheError> {
        let expires_at = Instant::now() + Duration::from_millis(window_ms);
        let cutoff = now_ms.saturating_sub(window_ms);

        let mut window = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry {
                hits: VecDeque::new(),
                expires_at,
            });

        while window.hits.front().is_some_and(|&ts| ts <= cutoff) {
            window.hits.pop_front();
        }

        let admitted = (window.hits.len() as u64) < limit;
        if admitted {
            window.hits.push_back(now_ms);
        }
        window.expires_at = expires_at;

        let outcome = WindowOutcome {
            admitted,
            count: window.hits.len() as u64,
            oldest_ms: window.hits.front().copied(),
        };
        drop(window);

        self.maybe_cleanup();
        Ok(outcome)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let now = Instant::now();

        if let Some(entry) = self.counters.get(key) {
            return Ok(Some(entry.expires_at.saturating_duration_since(now))
                .filter(|d| !d.is_zero()));
        }

        if let Some(entry) = self.sets.get(key) {
            return Ok(Some(entry.expires_at.saturating_duration_since(now))
                .filter(|d| !d.is_zero()));
        }

        if let Some(entry) = self.cache.get(key).await
            && let Some(ttl) = entry.ttl
        {
            return Ok(ttl
                .checked_sub(entry.created_at.elapsed())
                .filter(|d| !d.is_zero()));
        }

        Ok(None)
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn cache() -> InMemoryCache {
        InMemoryCache::new(&CacheConfig::memory())
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let cache = cache();
        cache.set("key1", b"value1".to_vec(), None).await.unwrap();
        assert_eq!(cache.get("key1").await.unwrap(), Some(b"value1".to_vec()));
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_covers_all_maps() {
        let cache = cache();
        cache.incr("c", TTL).await.unwrap();
        cache.set_add("s", "m", TTL).await.unwrap();

        assert!(cache.delete("c").await.unwrap());
        assert!(cache.delete("s").await.unwrap());
        assert!(!cache.delete("c").await.unwrap());
        assert_eq!(cache.get_counter("c").await.unwrap(), None);
        assert_eq!(cache.set_card("s").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_incr_atomic() {
        let cache = cache();
        assert_eq!(cache.incr("counter", TTL).await.unwrap(), 1);
        assert_eq!(cache.incr("counter", TTL).await.unwrap(), 2);
        assert_eq!(cache.incr("counter", TTL).await.unwrap(), 3);
        assert_eq!(cache.get_counter("counter").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_incr_concurrent() {
        let cache = std::sync::Arc::new(cache());
        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.incr("hot", TTL).await.unwrap() })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(cache.get_counter("hot").await.unwrap(), Some(50));
    }

    #[tokio::test]
    async fn test_incr_expired_resets() {
        let cache = cache();
        cache.incr("counter", Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.get_counter("counter").await.unwrap(), None);
        assert_eq!(cache.incr("counter", TTL).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incr_refreshes_ttl() {
        let cache = cache();
        cache.incr("counter", Duration::from_secs(5)).await.unwrap();
        cache.incr("counter", TTL).await.unwrap();
        assert!(cache.ttl("counter").await.unwrap().unwrap() > Duration::from_secs(50));
    }

    #[tokio::test]
    async fn test_set_counter_overwrites() {
        let cache = cache();
        cache.incr("counter", TTL).await.unwrap();
        cache.set_counter("counter", 500, TTL).await.unwrap();
        assert_eq!(cache.incr("counter", TTL).await.unwrap(), 501);
    }

    #[tokio::test]
    async fn test_set_add_dedups_members() {
        let cache = cache();
        assert_eq!(cache.set_add("uv", "1.1.1.1", TTL).await.unwrap(), 1);
        assert_eq!(cache.set_add("uv", "1.1.1.1", TTL).await.unwrap(), 1);
        assert_eq!(cache.set_add("uv", "2.2.2.2", TTL).await.unwrap(), 2);
        assert_eq!(cache.set_card("uv").await.unwrap(), 2);
        assert_eq!(cache.set_card("other").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expire_refreshes_value_ttl() {
        let cache = cache();
        cache
            .set("snap", b"1".to_vec(), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(cache.expire("snap", TTL).await.unwrap());
        assert!(cache.ttl("snap").await.unwrap().unwrap() > Duration::from_secs(50));
        assert_eq!(cache.get("snap").await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn test_expire_missing_key() {
        let cache = cache();
        assert!(!cache.expire("missing", TTL).await.unwrap());
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_value_ttl_expiration() {
        let cache = cache();
        cache
            .set("key1", b"value1".to_vec(), Some(Duration::from_millis(50)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        cache.cache.run_pending_tasks().await;
        assert_eq!(cache.get("key1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sliding_window_limits_and_slides() {
        let cache = cache();
        for i in 0..3 {
            let outcome = cache.sliding_window("rl", 1_000 + i, 1_000, 3).await.unwrap();
            assert!(outcome.admitted);
            assert_eq!(outcome.count, i + 1);
        }

        let rejected = cache.sliding_window("rl", 1_500, 1_000, 3).await.unwrap();
        assert!(!rejected.admitted);
        assert_eq!(rejected.count, 3);
        assert_eq!(rejected.oldest_ms, Some(1_000));

        // First hit falls out once the window has moved past it
        let slid = cache.sliding_window("rl", 2_000, 1_000, 3).await.unwrap();
        assert!(slid.admitted);
        assert_eq!(slid.oldest_ms, Some(1_001));
    }

    #[tokio::test]
    async fn test_ttl_for_missing_and_infinite() {
        let cache = cache();
        assert!(cache.ttl("missing").await.unwrap().is_none());
        cache.set("forever", b"x".to_vec(), None).await.unwrap();
        assert!(cache.ttl("forever").await.unwrap().is_none());
    }
}
