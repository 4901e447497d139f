//! Durable cache tier
//!
//! Relational cache table with explicit invalidation, versioning and hit
//! bookkeeping. Slower than the fast tier but strongly consistent, and the
//! source of truth for cache freshness accounting. Rows are never deleted
//! by invalidation, only flagged; time-based GC reclaims flagged rows past
//! the retention window.

pub mod schema;

use crate::config::DurableCacheConfig;
use crate::core::error::Result;
use crate::core::types::{CacheEntry, CacheTypeStats, EntryMeta, InvalidationScope, WriteOptions};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const UPSERT: &str = r#"
INSERT INTO cache_entries (
    cache_key, cache_type, cached_data, data_version, invalidated,
    user_id, scope_params, data_size, hit_count,
    created_at, last_updated_at, last_accessed_at
) VALUES (?, ?, ?, 1, 0, ?, ?, ?, 0, ?, ?, ?)
ON CONFLICT(cache_key) DO UPDATE SET
    cache_type      = excluded.cache_type,
    cached_data     = excluded.cached_data,
    data_version    = cache_entries.data_version + 1,
    invalidated     = 0,
    user_id         = excluded.user_id,
    scope_params    = excluded.scope_params,
    data_size       = excluded.data_size,
    last_updated_at = excluded.last_updated_at
"#;

const SELECT_LIVE: &str = r#"
SELECT cached_data, cache_type, data_version, hit_count, user_id, scope_params, created_at
FROM cache_entries
WHERE cache_key = ? AND invalidated = 0
"#;

const BUMP_HIT: &str = "UPDATE cache_entries \
     SET hit_count = hit_count + 1, last_accessed_at = ? WHERE cache_key = ?";

const INVALIDATE_KEY: &str =
    "UPDATE cache_entries SET invalidated = 1, last_updated_at = ? WHERE cache_key = ?";

const INVALIDATE_TYPE: &str =
    "UPDATE cache_entries SET invalidated = 1, last_updated_at = ? WHERE cache_type = ?";

const INVALIDATE_TYPE_FOR_USER: &str = "UPDATE cache_entries \
     SET invalidated = 1, last_updated_at = ? WHERE cache_type = ? AND user_id = ?";

const GC: &str = "DELETE FROM cache_entries WHERE invalidated = 1 AND last_updated_at < ?";

const SELECT_STATS: &str = "SELECT cache_type, entries, invalidated_entries, total_hits, \
     total_bytes, oldest_created_at, newest_updated_at FROM cache_stats ORDER BY cache_type";

/// Adapter over the relational cache table
#[derive(Clone)]
pub struct DurableCache {
    pool: SqlitePool,
}

impl DurableCache {
    /// Create the connection pool and apply the schema
    pub async fn connect(config: &DurableCacheConfig) -> Result<Self> {
        info!(
            "Connecting durable cache (url={}, pool_size={})",
            config.database_url, config.pool_size
        );

        let options =
            SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
            .connect_with(options)
            .await?;

        schema::apply(&pool).await?;
        Ok(Self { pool })
    }

    /// Look up a live entry
    ///
    /// Invalidated and missing rows are both plain misses. A hit bumps the
    /// row's hit counter and access time before returning; unlike the fast
    /// tier this bump is awaited, the durable row is the bookkeeping source
    /// of truth. An unreadable payload degrades to an empty object rather
    /// than failing the read.
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let Some(row) = sqlx::query(SELECT_LIVE)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
        else {
            debug!("durable cache miss: {}", key);
            return Ok(None);
        };

        let raw: String = row.get("cached_data");
        let data: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("durable payload unreadable for {}: {}", key, e);
                Value::Object(serde_json::Map::new())
            }
        };

        let scope_params = row
            .get::<Option<String>, _>("scope_params")
            .and_then(|s| serde_json::from_str(&s).ok());
        let meta = EntryMeta {
            cached_at: timestamp(row.get("created_at")),
            cache_type: row.get("cache_type"),
            hit_count: row.get("hit_count"),
            version: row.get("data_version"),
            user_id: row.get("user_id"),
            scope_params,
        };

        sqlx::query(BUMP_HIT)
            .bind(Utc::now().timestamp())
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(Some(CacheEntry { data, meta }))
    }

    /// Write an entry, upserting on the cache key
    ///
    /// A new key starts at version 1; overwriting bumps the version,
    /// replaces the payload, and clears any invalidation flag.
    pub async fn put(
        &self,
        key: &str,
        cache_type: &str,
        data: &Value,
        options: &WriteOptions,
    ) -> Result<()> {
        let payload = serde_json::to_string(data)?;
        let size = payload.len() as i64;
        let scope_params = options.scope_params.as_ref().map(|v| v.to_string());
        let now = Utc::now().timestamp();

        sqlx::query(UPSERT)
            .bind(key)
            .bind(cache_type)
            .bind(&payload)
            .bind(options.user_id.as_deref())
            .bind(scope_params.as_deref())
            .bind(size)
            .bind(now)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;

        debug!("durable cache put: {} ({} bytes)", key, size);
        Ok(())
    }

    /// Flag a single key stale
    ///
    /// The row stays behind with its version and hit history; the flag
    /// starts the GC retention clock.
    pub async fn invalidate(&self, key: &str) -> Result<u64> {
        let result = sqlx::query(INVALIDATE_KEY)
            .bind(Utc::now().timestamp())
            .bind(key)
            .execute(&self.pool)
            .await?;

        debug!("durable invalidate: {} ({} rows)", key, result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Flag every row of a cache type stale, optionally scoped to one user
    ///
    /// This expires all derived variants of a type (every page and filter
    /// combination of a list) without knowing their exact keys.
    pub async fn invalidate_by_type(
        &self,
        cache_type: &str,
        scope: &InvalidationScope,
    ) -> Result<u64> {
        let now = Utc::now().timestamp();
        let result = match &scope.user_id {
            Some(user_id) => {
                sqlx::query(INVALIDATE_TYPE_FOR_USER)
                    .bind(now)
                    .bind(cache_type)
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query(INVALIDATE_TYPE)
                    .bind(now)
                    .bind(cache_type)
                    .execute(&self.pool)
                    .await?
            }
        };

        debug!(
            "durable invalidate by type: {} ({} rows)",
            cache_type,
            result.rows_affected()
        );
        Ok(result.rows_affected())
    }

    /// Permanently delete invalidated rows older than the retention window
    pub async fn cleanup_invalidated(&self, days_old: u32) -> Result<u64> {
        let cutoff = Utc::now().timestamp() - i64::from(days_old) * 86_400;
        let result = sqlx::query(GC).bind(cutoff).execute(&self.pool).await?;

        if result.rows_affected() > 0 {
            info!(
                "durable cache GC removed {} rows older than {} days",
                result.rows_affected(),
                days_old
            );
        }
        Ok(result.rows_affected())
    }

    /// Read the per-type aggregate stats view
    pub async fn stats(&self) -> Result<Vec<CacheTypeStats>> {
        let rows = sqlx::query(SELECT_STATS).fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| CacheTypeStats {
                cache_type: row.get("cache_type"),
                entries: row.get("entries"),
                invalidated_entries: row.get("invalidated_entries"),
                total_hits: row.get("total_hits"),
                total_bytes: row.get("total_bytes"),
                oldest_created_at: row.get("oldest_created_at"),
                newest_updated_at: row.get("newest_updated_at"),
            })
            .collect())
    }

    /// Close the pool; subsequent operations fail fast
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
