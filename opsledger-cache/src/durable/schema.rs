//! Embedded schema for the durable cache table
//!
//! The crate owns this layout: one row per cache key, soft-invalidated by
//! flag, plus a precomputed per-type aggregate view for observability.

use crate::core::error::{CacheError, Result};
use sqlx::SqlitePool;
use tracing::debug;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_key        TEXT PRIMARY KEY,
    cache_type       TEXT NOT NULL,
    cached_data      TEXT NOT NULL,
    data_version     INTEGER NOT NULL DEFAULT 1,
    invalidated      INTEGER NOT NULL DEFAULT 0,
    user_id          TEXT,
    scope_params     TEXT,
    data_size        INTEGER NOT NULL DEFAULT 0,
    hit_count        INTEGER NOT NULL DEFAULT 0,
    created_at       INTEGER NOT NULL,
    last_updated_at  INTEGER NOT NULL,
    last_accessed_at INTEGER NOT NULL
)
"#;

const CREATE_TYPE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_cache_entries_type ON cache_entries (cache_type)";

const CREATE_GC_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_cache_entries_gc \
     ON cache_entries (invalidated, last_updated_at)";

const CREATE_STATS_VIEW: &str = r#"
CREATE VIEW IF NOT EXISTS cache_stats AS
SELECT cache_type,
       COUNT(*)                   AS entries,
       COALESCE(SUM(invalidated), 0) AS invalidated_entries,
       COALESCE(SUM(hit_count), 0)   AS total_hits,
       COALESCE(SUM(data_size), 0)   AS total_bytes,
       MIN(created_at)            AS oldest_created_at,
       MAX(last_updated_at)       AS newest_updated_at
FROM cache_entries
GROUP BY cache_type
"#;

/// Apply the schema, idempotently
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    for statement in [CREATE_TABLE, CREATE_TYPE_INDEX, CREATE_GC_INDEX, CREATE_STATS_VIEW] {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| CacheError::Schema(e.to_string()))?;
    }
    debug!("durable cache schema applied");
    Ok(())
}
