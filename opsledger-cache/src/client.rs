//! Cache client
//!
//! One `CacheClient` is constructed at worker startup and handed to request
//! handlers by dependency injection. It bundles both tiers, the hybrid
//! reader, and the invalidator, and applies the boundary error policy: a
//! failing cache primitive is logged and degraded to a miss, never surfaced
//! to the handler. Only origin-fetch errors pass through `hybrid_read`.

use crate::config::CacheConfig;
use crate::core::error::Result;
use crate::core::key::{self, KeyParams};
use crate::core::types::{
    CacheEntry, CacheTypeStats, InvalidationScope, ReadOptions, WriteOptions,
};
use crate::durable::DurableCache;
use crate::fast::{FastCache, FastCacheStats};
use crate::hybrid::{HybridCacheReader, HybridRead};
use crate::invalidation::CacheInvalidator;
use serde_json::Value;
use std::future::Future;
use tracing::warn;

/// Entry point to the cache subsystem
#[derive(Clone)]
pub struct CacheClient {
    config: CacheConfig,
    fast: FastCache,
    durable: DurableCache,
    hybrid: HybridCacheReader,
    invalidator: CacheInvalidator,
}

impl CacheClient {
    /// Build both tiers from configuration
    pub async fn connect(config: &CacheConfig) -> Result<Self> {
        let fast = FastCache::new(&config.fast);
        let durable = DurableCache::connect(&config.durable).await?;
        let hybrid = HybridCacheReader::new(fast.clone(), durable.clone());
        let invalidator = CacheInvalidator::new(fast.clone(), durable.clone());

        Ok(Self {
            config: config.clone(),
            fast,
            durable,
            hybrid,
            invalidator,
        })
    }

    /// Spawn the background maintenance loops: the fast-tier expiry sweep
    /// and the durable-tier GC pass
    pub fn start_maintenance(&self) -> Vec<tokio::task::JoinHandle<()>> {
        vec![
            self.fast.start_expiry_sweep(self.config.fast.sweep_interval_ms),
            self.invalidator.start_gc_task(
                std::time::Duration::from_secs(self.config.durable.gc_interval_secs),
                self.config.durable.retention_days,
            ),
        ]
    }

    /// Deterministic cache key from a type tag and parameters
    pub fn build_key(&self, cache_type: &str, params: &KeyParams) -> String {
        key::build_key(cache_type, params)
    }

    /// Fast-tier lookup; any failure degrades to a miss
    pub async fn fast_get(&self, key: &str) -> Option<CacheEntry> {
        match self.fast.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("fast_get degraded to miss for {}: {}", key, e);
                None
            }
        }
    }

    /// Fast-tier write; reports success instead of failing
    pub async fn fast_put(
        &self,
        key: &str,
        cache_type: &str,
        data: &Value,
        options: &WriteOptions,
    ) -> bool {
        match self.fast.put(key, cache_type, data, options).await {
            Ok(()) => true,
            Err(e) => {
                warn!("fast_put failed for {}: {}", key, e);
                false
            }
        }
    }

    pub async fn fast_delete(&self, key: &str) {
        if let Err(e) = self.fast.delete(key).await {
            warn!("fast_delete failed for {}: {}", key, e);
        }
    }

    pub async fn fast_delete_by_prefix(&self, prefix: &str) {
        if let Err(e) = self.fast.delete_by_prefix(prefix).await {
            warn!("fast_delete_by_prefix failed for {}: {}", prefix, e);
        }
    }

    /// Durable-tier lookup; any failure degrades to a miss
    pub async fn durable_get(&self, key: &str) -> Option<CacheEntry> {
        match self.durable.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("durable_get degraded to miss for {}: {}", key, e);
                None
            }
        }
    }

    /// Durable-tier write; reports success instead of failing
    pub async fn durable_put(
        &self,
        key: &str,
        cache_type: &str,
        data: &Value,
        options: &WriteOptions,
    ) -> bool {
        match self.durable.put(key, cache_type, data, options).await {
            Ok(()) => true,
            Err(e) => {
                warn!("durable_put failed for {}: {}", key, e);
                false
            }
        }
    }

    pub async fn durable_invalidate(&self, key: &str) {
        if let Err(e) = self.durable.invalidate(key).await {
            warn!("durable_invalidate failed for {}: {}", key, e);
        }
    }

    pub async fn durable_invalidate_by_type(&self, cache_type: &str, scope: &InvalidationScope) {
        if let Err(e) = self.durable.invalidate_by_type(cache_type, scope).await {
            warn!("durable_invalidate_by_type failed for {}: {}", cache_type, e);
        }
    }

    /// GC pass over flagged durable rows, returns rows removed
    pub async fn durable_cleanup(&self, days_old: u32) -> u64 {
        self.invalidator.run_gc(days_old).await
    }

    /// Per-type aggregate stats; failures yield an empty list
    pub async fn durable_stats(&self) -> Vec<CacheTypeStats> {
        match self.durable.stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("durable_stats failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Read-through resolution across both tiers, see [`HybridCacheReader::read`]
    pub async fn hybrid_read<F, Fut, E>(
        &self,
        key: &str,
        cache_type: &str,
        origin: F,
        options: &ReadOptions,
    ) -> std::result::Result<HybridRead, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Value, E>>,
    {
        self.hybrid.read(key, cache_type, origin, options).await
    }

    pub fn fast_stats(&self) -> FastCacheStats {
        self.fast.stats()
    }

    pub fn invalidator(&self) -> &CacheInvalidator {
        &self.invalidator
    }

    pub fn fast(&self) -> &FastCache {
        &self.fast
    }

    pub fn durable(&self) -> &DurableCache {
        &self.durable
    }
}
