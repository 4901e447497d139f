//! Fast cache tier
//!
//! Low-latency, eventually-consistent key/value cache with per-entry TTL.
//! This tier is a pure optimization layer: every operation degrades to a
//! miss rather than surfacing a failure to the request that triggered it.

pub mod store;

pub use store::{FastCacheStats, FastStore};

use crate::config::FastCacheConfig;
use crate::core::error::Result;
use crate::core::types::{CacheEntry, EntryMeta, WriteOptions};
use serde_json::Value;
use tracing::{debug, warn};

/// Adapter over the fast key/value store
///
/// Values are stored as a serialized `{data, meta}` envelope so a reader
/// gets the payload and its bookkeeping in one round trip.
#[derive(Clone)]
pub struct FastCache {
    store: FastStore,
    default_ttl_secs: u64,
}

impl FastCache {
    pub fn new(config: &FastCacheConfig) -> Self {
        Self {
            store: FastStore::new(),
            default_ttl_secs: config.default_ttl_secs,
        }
    }

    /// Look up an entry
    ///
    /// A hit triggers a detached metadata rewrite (hit counter bump, expiry
    /// reset to the original TTL). The rewrite is last-write-wins and may
    /// lose increments under racing reads; the counter is analytics, the
    /// durable tier keeps the authoritative numbers. A corrupt envelope is
    /// dropped and reported as a miss.
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let Some((bytes, ttl_secs)) = self.store.get(key) else {
            debug!("fast cache miss: {}", key);
            return Ok(None);
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("fast cache entry corrupt, dropping {}: {}", key, e);
                self.store.remove(key);
                return Ok(None);
            }
        };

        let store = self.store.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            bump_hit_count(&store, &key, ttl_secs);
        });

        Ok(Some(entry))
    }

    /// Write an entry with a fresh metadata envelope
    ///
    /// TTL comes from `options.ttl_secs`, falling back to the configured
    /// default.
    pub async fn put(
        &self,
        key: &str,
        cache_type: &str,
        data: &Value,
        options: &WriteOptions,
    ) -> Result<()> {
        let ttl_secs = options.ttl_secs.unwrap_or(self.default_ttl_secs);
        let entry = CacheEntry {
            data: data.clone(),
            meta: EntryMeta::new(cache_type, options),
        };
        let bytes = serde_json::to_vec(&entry)?;

        debug!("fast cache put: {} ({} bytes, ttl={}s)", key, bytes.len(), ttl_secs);
        self.store.put(key, bytes, ttl_secs);
        Ok(())
    }

    /// Delete a single key
    pub async fn delete(&self, key: &str) -> Result<()> {
        if self.store.remove(key) {
            debug!("fast cache delete: {}", key);
        }
        Ok(())
    }

    /// Delete every key under a prefix
    ///
    /// Cost is proportional to the number of matching keys; used to expire
    /// all derived variants of a list type at once.
    pub async fn delete_by_prefix(&self, prefix: &str) -> Result<()> {
        let removed = self.store.remove_prefix(prefix);
        debug!("fast cache prefix delete: {} ({} keys)", prefix, removed);
        Ok(())
    }

    /// Start the background expiry sweep
    pub fn start_expiry_sweep(&self, interval_ms: u64) -> tokio::task::JoinHandle<()> {
        self.store.start_expiry_sweep(interval_ms)
    }

    pub fn stats(&self) -> FastCacheStats {
        self.store.stats()
    }
}

/// Rewrite an entry's metadata after a hit, reusing the original TTL
fn bump_hit_count(store: &FastStore, key: &str, ttl_secs: u64) {
    let Some((bytes, _)) = store.get_raw(key) else {
        return;
    };

    let mut entry: CacheEntry = match serde_json::from_slice(&bytes) {
        Ok(entry) => entry,
        Err(_) => return,
    };
    entry.meta.hit_count += 1;

    match serde_json::to_vec(&entry) {
        Ok(bytes) => store.put(key, bytes, ttl_secs),
        Err(e) => warn!("fast cache stat update failed for {}: {}", key, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache() -> FastCache {
        FastCache::new(&FastCacheConfig::default())
    }

    #[tokio::test]
    async fn envelope_roundtrip() {
        let cache = cache();
        let data = json!({"client": "Acme GmbH", "open_tasks": 3});

        cache
            .put("client_detail:id=7", "client_detail", &data, &WriteOptions::default())
            .await
            .unwrap();

        let entry = cache.get("client_detail:id=7").await.unwrap().unwrap();
        assert_eq!(entry.data, data);
        assert_eq!(entry.meta.cache_type, "client_detail");
        assert_eq!(entry.meta.version, 1);
        assert_eq!(entry.meta.hit_count, 0);
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let cache = cache();
        assert!(cache.get("nothing_here").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn hit_count_is_bumped_in_background() {
        let cache = cache();
        cache
            .put("hot", "clients_list", &json!([1, 2]), &WriteOptions::default())
            .await
            .unwrap();

        cache.get("hot").await.unwrap().unwrap();
        // the bump is detached; give it a moment to land
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let entry = cache.get("hot").await.unwrap().unwrap();
        assert_eq!(entry.meta.hit_count, 1);
    }

    #[tokio::test]
    async fn ttl_override_expires_entry() {
        let cache = cache();
        let options = WriteOptions {
            ttl_secs: Some(1),
            ..Default::default()
        };
        cache
            .put("blip", "clients_list", &json!(1), &options)
            .await
            .unwrap();

        assert!(cache.get("blip").await.unwrap().is_some());
        tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
        assert!(cache.get("blip").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_by_prefix_clears_list_variants() {
        let cache = cache();
        for page in 1..=3 {
            let key = format!("clients_list:page={}", page);
            cache
                .put(&key, "clients_list", &json!([page]), &WriteOptions::default())
                .await
                .unwrap();
        }
        cache
            .put("task_detail:id=1", "task_detail", &json!({}), &WriteOptions::default())
            .await
            .unwrap();

        cache.delete_by_prefix("clients_list").await.unwrap();

        for page in 1..=3 {
            let key = format!("clients_list:page={}", page);
            assert!(cache.get(&key).await.unwrap().is_none());
        }
        assert!(cache.get("task_detail:id=1").await.unwrap().is_some());
    }
}
