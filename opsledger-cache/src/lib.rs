pub mod client;
pub mod config;
pub mod core;
pub mod durable;
pub mod fast;
pub mod hybrid;
pub mod invalidation;

// Re-export commonly used types
pub use client::CacheClient;
pub use config::{CacheConfig, DurableCacheConfig, FastCacheConfig, LoggingConfig};
pub use core::{
    CacheEntry, CacheError, CacheSource, CacheTypeStats, EntryMeta, InvalidationScope, KeyParams,
    ParamValue, ReadOptions, Result, WriteOptions, build_key,
};
pub use durable::DurableCache;
pub use fast::{FastCache, FastCacheStats};
pub use hybrid::{HybridCacheReader, HybridRead, WriteBack};
pub use invalidation::CacheInvalidator;
