//! Hybrid read-through
//!
//! Orchestrates the fast → durable → origin lookup chain. The contract is
//! that a cache malfunction can cost latency but never correctness: only an
//! origin failure ever reaches the caller, and the function signature
//! enforces it.

use crate::core::types::{CacheEntry, CacheSource, EntryMeta, ReadOptions};
use crate::durable::DurableCache;
use crate::fast::FastCache;
use serde_json::Value;
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle to the detached cache writes issued by a hybrid read
///
/// Dropping it detaches the writes; awaiting `settled` is only useful for
/// diagnostics and tests. Write failures are logged inside the tasks either
/// way.
#[derive(Debug, Default)]
pub struct WriteBack {
    handles: Vec<JoinHandle<()>>,
}

impl WriteBack {
    fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait until every detached write has finished
    pub async fn settled(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("cache write-back task panicked: {}", e);
            }
        }
    }
}

/// Result of a hybrid read
#[derive(Debug)]
pub struct HybridRead {
    pub data: Value,
    /// Whether the value came out of a cache tier
    pub cached: bool,
    pub source: CacheSource,
    /// Metadata of the served cache entry, when one existed
    pub entry_meta: Option<EntryMeta>,
    pub write_back: WriteBack,
}

/// Read-through reader over both cache tiers
#[derive(Clone)]
pub struct HybridCacheReader {
    fast: FastCache,
    durable: DurableCache,
}

impl HybridCacheReader {
    pub fn new(fast: FastCache, durable: DurableCache) -> Self {
        Self { fast, durable }
    }

    /// Resolve a key through the fallback chain
    ///
    /// 1. Fast tier; a hit returns immediately.
    /// 2. Durable tier (when `use_durable_fallback`); a hit returns after
    ///    spawning a detached fast-tier backfill.
    /// 3. Full miss: `origin` computes the authoritative value, and both
    ///    tiers are repopulated by detached concurrent writes.
    ///
    /// A tier returning an error is logged and treated as a miss so the
    /// chain keeps going; if any tier errored before the origin call, the
    /// result is tagged `error_fallback` and no cache writes are issued.
    /// Origin errors propagate unchanged.
    pub async fn read<F, Fut, E>(
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
        let mut degraded = false;

        match self.fast.get(key).await {
            Ok(Some(entry)) => {
                debug!("hybrid read served from fast tier: {}", key);
                return Ok(Self::hit(entry, CacheSource::Fast));
            }
            Ok(None) => {}
            Err(e) => {
                warn!("fast tier failed during hybrid read of {}: {}", key, e);
                degraded = true;
            }
        }

        if options.use_durable_fallback {
            match self.durable.get(key).await {
                Ok(Some(entry)) => {
                    debug!("hybrid read served from durable tier: {}", key);
                    let write_back = self.spawn_backfill(key, cache_type, &entry, options);
                    let mut read = Self::hit(entry, CacheSource::Durable);
                    read.write_back = write_back;
                    return Ok(read);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("durable tier failed during hybrid read of {}: {}", key, e);
                    degraded = true;
                }
            }
        }

        let data = origin().await?;

        if degraded {
            debug!("hybrid read fell back to origin after cache error: {}", key);
            return Ok(HybridRead {
                data,
                cached: false,
                source: CacheSource::ErrorFallback,
                entry_meta: None,
                write_back: WriteBack::empty(),
            });
        }

        debug!("hybrid read computed fresh value: {}", key);
        let write_back = self.spawn_fresh_writes(key, cache_type, &data, options);
        Ok(HybridRead {
            data,
            cached: false,
            source: CacheSource::Fresh,
            entry_meta: None,
            write_back,
        })
    }

    fn hit(entry: CacheEntry, source: CacheSource) -> HybridRead {
        HybridRead {
            data: entry.data,
            cached: true,
            source,
            entry_meta: Some(entry.meta),
            write_back: WriteBack::empty(),
        }
    }

    /// Repopulate the fast tier from a durable hit, detached
    fn spawn_backfill(
        &self,
        key: &str,
        cache_type: &str,
        entry: &CacheEntry,
        options: &ReadOptions,
    ) -> WriteBack {
        let fast = self.fast.clone();
        let key = key.to_string();
        let cache_type = cache_type.to_string();
        let data = entry.data.clone();
        let write = options.write.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = fast.put(&key, &cache_type, &data, &write).await {
                warn!("fast tier backfill failed for {}: {}", key, e);
            }
        });
        WriteBack {
            handles: vec![handle],
        }
    }

    /// Write a fresh origin value to both tiers, detached and concurrent
    fn spawn_fresh_writes(
        &self,
        key: &str,
        cache_type: &str,
        data: &Value,
        options: &ReadOptions,
    ) -> WriteBack {
        let mut handles = Vec::with_capacity(2);

        let fast = self.fast.clone();
        let fast_key = key.to_string();
        let fast_type = cache_type.to_string();
        let fast_data = data.clone();
        let fast_write = options.write.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = fast.put(&fast_key, &fast_type, &fast_data, &fast_write).await {
                warn!("fast tier write-through failed for {}: {}", fast_key, e);
            }
        }));

        if options.use_durable_fallback {
            let durable = self.durable.clone();
            let key = key.to_string();
            let cache_type = cache_type.to_string();
            let data = data.clone();
            let write = options.write.clone();
            handles.push(tokio::spawn(async move {
                if let Err(e) = durable.put(&key, &cache_type, &data, &write).await {
                    warn!("durable tier write-through failed for {}: {}", key, e);
                }
            }));
        }

        WriteBack { handles }
    }
}
