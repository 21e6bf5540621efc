//! Domain repository for SQLite operations
//!
//! Reads support optional caching. Pass `Some(cache)` to enable it, or `None`
//! to bypass. Mutations invalidate the cached record.

use std::time::Duration;

use sqlx::SqlitePool;

use crate::core::constants::CACHE_TTL_DOMAIN;
use crate::data::cache::{CacheKey, CacheService};
use crate::data::sqlite::SqliteError;
use crate::data::types::DomainRow;

type DomainTuple = (String, bool, bool, i64, i64, i64);

const SELECT_COLUMNS: &str = "host, verified, tracked, uv_adjustment, created_at, updated_at";

fn from_tuple(row: DomainTuple) -> DomainRow {
    let (host, verified, tracked, uv_adjustment, created_at, updated_at) = row;
    DomainRow {
        host,
        verified,
        tracked,
        uv_adjustment,
        created_at,
        updated_at,
    }
}

async fn invalidate(cache: Option<&CacheService>, host: &str) {
    if let Some(cache) = cache
        && let Err(e) = cache.delete(&CacheKey::domain(host)).await
    {
        tracing::warn!(%host, error = %e, "Cache invalidation error");
    }
}

/// Get a domain record by host (with optional caching)
///
/// Absent records are cached too, so unknown hosts do not hit SQLite on
/// every event.
pub async fn get_domain(
    pool: &SqlitePool,
    cache: Option<&CacheService>,
    host: &str,
) -> Result<Option<DomainRow>, SqliteError> {
    let key = CacheKey::domain(host);

    if let Some(cache) = cache {
        match cache.get::<Option<DomainRow>>(&key).await {
            Ok(Some(cached)) => {
                tracing::trace!(%host, "Domain cache hit");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(%host, error = %e, "Domain cache read error"),
        }
    }

    let row: Option<DomainTuple> = sqlx::query_as(&format!(
        "SELECT {SELECT_COLUMNS} FROM domains WHERE host = ?"
    ))
    .bind(host)
    .fetch_optional(pool)
    .await?;
    let domain = row.map(from_tuple);

    if let Some(cache) = cache
        && let Err(e) = cache
            .set(&key, &domain, Some(Duration::from_secs(CACHE_TTL_DOMAIN)))
            .await
    {
        tracing::warn!(%host, error = %e, "Domain cache write error");
    }

    Ok(domain)
}

/// Create or update the tracking flags of a domain
pub async fn upsert_domain(
    pool: &SqlitePool,
    cache: Option<&CacheService>,
    host: &str,
    verified: bool,
    tracked: bool,
) -> Result<DomainRow, SqliteError> {
    let now = chrono::Utc::now().timestamp();

    let row: DomainTuple = sqlx::query_as(&format!(
        r#"
        INSERT INTO domains (host, verified, tracked, uv_adjustment, created_at, updated_at)
        VALUES (?, ?, ?, 0, ?, ?)
        ON CONFLICT(host) DO UPDATE SET
            verified = excluded.verified,
            tracked = excluded.tracked,
            updated_at = excluded.updated_at
        RETURNING {SELECT_COLUMNS}
        "#
    ))
    .bind(host)
    .bind(verified)
    .bind(tracked)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    invalidate(cache, host).await;
    Ok(from_tuple(row))
}

/// Overwrite the manual UV adjustment of a domain (last write wins)
///
/// Unknown hosts get an untracked record holding the adjustment.
pub async fn set_uv_adjustment(
    pool: &SqlitePool,
    cache: Option<&CacheService>,
    host: &str,
    delta: i64,
) -> Result<(), SqliteError> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO domains (host, verified, tracked, uv_adjustment, created_at, updated_at)
        VALUES (?, 0, 0, ?, ?, ?)
        ON CONFLICT(host) DO UPDATE SET
            uv_adjustment = excluded.uv_adjustment,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(host)
    .bind(delta)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    invalidate(cache, host).await;
    Ok(())
}
