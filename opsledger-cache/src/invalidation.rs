//! Invalidation across both tiers
//!
//! Called by mutating handlers after the authoritative write has committed.
//! Failures here are logged and absorbed: stale cache is a lesser failure
//! than surfacing an error for a mutation that already succeeded.

use crate::core::types::InvalidationScope;
use crate::durable::DurableCache;
use crate::fast::FastCache;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Composed invalidation over the fast and durable tiers
#[derive(Clone)]
pub struct CacheInvalidator {
    fast: FastCache,
    durable: DurableCache,
}

impl CacheInvalidator {
    pub fn new(fast: FastCache, durable: DurableCache) -> Self {
        Self { fast, durable }
    }

    /// Expire one well-known key: durable flag plus fast delete
    pub async fn invalidate_exact(&self, key: &str) {
        if let Err(e) = self.durable.invalidate(key).await {
            warn!("durable invalidation failed for {}: {}", key, e);
        }
        if let Err(e) = self.fast.delete(key).await {
            warn!("fast delete failed for {}: {}", key, e);
        }
        debug!("invalidated cache key: {}", key);
    }

    /// Expire every variant of a cache type
    ///
    /// The durable tier flags by type (optionally narrowed to one user);
    /// the fast tier has no invalidation flag, so every key under the type
    /// prefix is deleted outright.
    pub async fn invalidate_by_type(&self, cache_type: &str, scope: &InvalidationScope) {
        if let Err(e) = self.durable.invalidate_by_type(cache_type, scope).await {
            warn!("durable bulk invalidation failed for {}: {}", cache_type, e);
        }
        if let Err(e) = self.fast.delete_by_prefix(cache_type).await {
            warn!("fast prefix delete failed for {}: {}", cache_type, e);
        }
        debug!("invalidated cache type: {}", cache_type);
    }

    /// Run one GC pass over flagged durable rows, absorbing errors
    pub async fn run_gc(&self, days_old: u32) -> u64 {
        match self.durable.cleanup_invalidated(days_old).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!("durable cache GC failed: {}", e);
                0
            }
        }
    }

    /// Start the periodic GC task
    pub fn start_gc_task(&self, interval: Duration, days_old: u32) -> tokio::task::JoinHandle<()> {
        info!(
            "Starting durable cache GC task (interval={:?}, retention={}d)",
            interval, days_old
        );

        let invalidator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                invalidator.run_gc(days_old).await;
            }
        })
    }
}
