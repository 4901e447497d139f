use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Metadata carried alongside every cached payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryMeta {
    /// When the payload was written
    pub cached_at: DateTime<Utc>,
    /// The cache type tag the payload was written under
    pub cache_type: String,
    /// Reads served from this entry
    pub hit_count: i64,
    /// Overwrite generation, starts at 1
    pub version: i64,
    /// Optional attribution for scoped bulk invalidation
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub scope_params: Option<Value>,
}

impl EntryMeta {
    /// Fresh metadata for a first write
    pub fn new(cache_type: &str, options: &WriteOptions) -> Self {
        Self {
            cached_at: Utc::now(),
            cache_type: cache_type.to_string(),
            hit_count: 0,
            version: 1,
            user_id: options.user_id.clone(),
            scope_params: options.scope_params.clone(),
        }
    }
}

/// A cached artifact: opaque payload plus metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub data: Value,
    pub meta: EntryMeta,
}

/// Where a hybrid read was ultimately served from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    /// Served from the fast tier
    Fast,
    /// Served from the durable tier
    Durable,
    /// Computed by the origin fetch on a full miss
    Fresh,
    /// Computed by the origin fetch after a cache malfunction
    ErrorFallback,
}

impl fmt::Display for CacheSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheSource::Fast => "fast",
            CacheSource::Durable => "durable",
            CacheSource::Fresh => "fresh",
            CacheSource::ErrorFallback => "error_fallback",
        };
        f.write_str(s)
    }
}

/// Options for cache writes
///
/// All fields are optional; `ttl_secs` only applies to the fast tier (the
/// durable tier has no expiry, only explicit invalidation).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOptions {
    /// Fast-tier TTL override in seconds (adapter default when `None`)
    pub ttl_secs: Option<u64>,
    /// User the artifact belongs to, for scoped invalidation
    pub user_id: Option<String>,
    /// Free-form scope attribution, stored for diagnostics
    pub scope_params: Option<Value>,
}

/// Options for hybrid reads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOptions {
    /// Consult the durable tier on a fast-tier miss and write fresh values
    /// through to it
    pub use_durable_fallback: bool,
    /// Write options applied to backfill and fresh writes
    pub write: WriteOptions,
}

impl ReadOptions {
    /// Read options with the durable fallback enabled
    pub fn with_durable_fallback() -> Self {
        Self {
            use_durable_fallback: true,
            write: WriteOptions::default(),
        }
    }
}

/// Filter for bulk invalidation of a cache type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvalidationScope {
    /// Restrict invalidation to entries attributed to this user
    pub user_id: Option<String>,
}

/// One row of the per-type aggregate stats view
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheTypeStats {
    pub cache_type: String,
    /// All rows for the type, live and invalidated
    pub entries: i64,
    pub invalidated_entries: i64,
    pub total_hits: i64,
    pub total_bytes: i64,
    /// Unix seconds
    pub oldest_created_at: i64,
    pub newest_updated_at: i64,
}
