use parking_lot::RwLock;
use radix_trie::{Trie, TrieCommon};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One stored value with its expiry bookkeeping
#[derive(Debug, Clone)]
struct StoredEntry {
    bytes: Vec<u8>,
    /// TTL the entry was written with, reused by metadata rewrites
    ttl_secs: u64,
    expires_at: Instant,
    accessed_at: Instant,
}

impl StoredEntry {
    fn new(bytes: Vec<u8>, ttl_secs: u64) -> Self {
        let now = Instant::now();
        Self {
            bytes,
            ttl_secs,
            expires_at: now + Duration::from_secs(ttl_secs),
            accessed_at: now,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn touch(&mut self) {
        self.accessed_at = Instant::now();
    }
}

/// Counters for the fast tier
#[derive(Debug, Default, Clone)]
pub struct FastCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub deletes: u64,
    /// Entries destroyed by TTL expiry
    pub expired: u64,
}

impl FastCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Low-latency key/value store with per-entry absolute TTL
///
/// Expiry is destructive: once the TTL elapses the entry is gone, there is
/// no soft-invalidation flag. Keys share a radix trie so prefix scans (used
/// for coarse invalidation of every derived key of a type) stay cheap.
#[derive(Clone)]
pub struct FastStore {
    data: Arc<RwLock<Trie<String, StoredEntry>>>,
    stats: Arc<RwLock<FastCacheStats>>,
}

impl FastStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(Trie::new())),
            stats: Arc::new(RwLock::new(FastCacheStats::default())),
        }
    }

    /// Get the raw bytes and original TTL for a key
    ///
    /// Expired entries are removed on the way out and reported as misses.
    pub fn get(&self, key: &str) -> Option<(Vec<u8>, u64)> {
        let mut data = self.data.write();
        let mut stats = self.stats.write();

        match data.get_mut(key) {
            Some(entry) if entry.is_expired() => {
                debug!("fast entry expired: {}", key);
                data.remove(key);
                stats.entries = stats.entries.saturating_sub(1);
                stats.expired += 1;
                stats.misses += 1;
                None
            }
            Some(entry) => {
                entry.touch();
                stats.hits += 1;
                Some((entry.bytes.clone(), entry.ttl_secs))
            }
            None => {
                stats.misses += 1;
                None
            }
        }
    }

    /// Get the raw bytes and original TTL without touching hit/miss counters
    ///
    /// Used by metadata rewrites, which are not logical reads.
    pub fn get_raw(&self, key: &str) -> Option<(Vec<u8>, u64)> {
        let data = self.data.read();
        data.get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| (entry.bytes.clone(), entry.ttl_secs))
    }

    /// Insert or overwrite a key with the given TTL
    pub fn put(&self, key: &str, bytes: Vec<u8>, ttl_secs: u64) {
        let mut data = self.data.write();
        let is_new = data
            .insert(key.to_string(), StoredEntry::new(bytes, ttl_secs))
            .is_none();

        let mut stats = self.stats.write();
        stats.puts += 1;
        if is_new {
            stats.entries += 1;
        }
    }

    /// Remove a single key, returns whether it existed
    pub fn remove(&self, key: &str) -> bool {
        let mut data = self.data.write();
        let removed = data.remove(key).is_some();

        if removed {
            let mut stats = self.stats.write();
            stats.deletes += 1;
            stats.entries = stats.entries.saturating_sub(1);
        }
        removed
    }

    /// Remove every key under a prefix, returns how many were removed
    pub fn remove_prefix(&self, prefix: &str) -> usize {
        let mut data = self.data.write();
        let keys: Vec<String> = data
            .get_raw_descendant(prefix)
            .map(|subtrie| subtrie.keys().cloned().collect())
            .unwrap_or_default();

        for key in &keys {
            data.remove(key);
        }

        let mut stats = self.stats.write();
        stats.deletes += keys.len() as u64;
        stats.entries = stats.entries.saturating_sub(keys.len());
        keys.len()
    }

    /// Remove every expired entry, returns how many were purged
    pub fn purge_expired(&self) -> usize {
        let mut data = self.data.write();
        let expired: Vec<String> = data
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            data.remove(key);
        }

        if !expired.is_empty() {
            let mut stats = self.stats.write();
            stats.expired += expired.len() as u64;
            stats.entries = stats.entries.saturating_sub(expired.len());
        }
        expired.len()
    }

    /// Start the background expiry sweep task
    pub fn start_expiry_sweep(&self, interval_ms: u64) -> tokio::task::JoinHandle<()> {
        info!("Starting fast-cache expiry sweep (interval={}ms)", interval_ms);

        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
            loop {
                interval.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!("expiry sweep purged {} entries", purged);
                }
            }
        })
    }

    pub fn stats(&self) -> FastCacheStats {
        self.stats.read().clone()
    }
}

impl Default for FastStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_roundtrip() {
        let store = FastStore::new();
        store.put("k1", b"v1".to_vec(), 60);

        let (bytes, ttl) = store.get("k1").unwrap();
        assert_eq!(bytes, b"v1".to_vec());
        assert_eq!(ttl, 60);
        assert!(store.get("missing").is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_destroyed() {
        let store = FastStore::new();
        store.put("short", b"x".to_vec(), 1);

        assert!(store.get("short").is_some());
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(store.get("short").is_none());

        let stats = store.stats();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.expired, 1);
    }

    #[test]
    fn remove_prefix_leaves_other_types() {
        let store = FastStore::new();
        store.put("clients_list:page=1", b"a".to_vec(), 60);
        store.put("clients_list:page=2", b"b".to_vec(), 60);
        store.put("tasks_list:page=1", b"c".to_vec(), 60);

        let removed = store.remove_prefix("clients_list");
        assert_eq!(removed, 2);
        assert!(store.get("clients_list:page=1").is_none());
        assert!(store.get("clients_list:page=2").is_none());
        assert!(store.get("tasks_list:page=1").is_some());
    }

    #[tokio::test]
    async fn purge_expired_only_removes_dead_entries() {
        let store = FastStore::new();
        store.put("dead", b"x".to_vec(), 1);
        store.put("live", b"y".to_vec(), 600);

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(store.purge_expired(), 1);
        assert!(store.get("live").is_some());
    }
}
