use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level cache subsystem configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub fast: FastCacheConfig,
    pub durable: DurableCacheConfig,
    pub logging: LoggingConfig,
}

/// Fast tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastCacheConfig {
    /// TTL applied when a write does not override it
    pub default_ttl_secs: u64,
    /// Background expiry sweep interval in milliseconds
    pub sweep_interval_ms: u64,
}

/// Durable tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurableCacheConfig {
    pub database_url: String,
    pub pool_size: u32,
    pub connect_timeout_ms: u64,
    /// Days an invalidated row survives before GC may delete it
    pub retention_days: u32,
    /// How often the background GC pass runs
    pub gc_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fast: FastCacheConfig::default(),
            durable: DurableCacheConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}

impl Default for FastCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3600,
            sweep_interval_ms: 60_000,
        }
    }
}

impl Default for DurableCacheConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://opsledger_cache.db".to_string(),
            pool_size: 5,
            connect_timeout_ms: 5_000,
            retention_days: 7,
            gc_interval_secs: 3600,
        }
    }
}

impl CacheConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: CacheConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let config = CacheConfig::default();
        assert_eq!(config.fast.default_ttl_secs, 3600);
        assert_eq!(config.durable.retention_days, 7);
    }

    #[test]
    fn parses_yaml() {
        let yaml = r#"
fast:
  default_ttl_secs: 600
  sweep_interval_ms: 30000
durable:
  database_url: "sqlite::memory:"
  pool_size: 1
  connect_timeout_ms: 1000
  retention_days: 3
  gc_interval_secs: 900
logging:
  level: debug
  format: pretty
"#;
        let config: CacheConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.fast.default_ttl_secs, 600);
        assert_eq!(config.durable.database_url, "sqlite::memory:");
        assert_eq!(config.durable.retention_days, 3);
        assert_eq!(config.logging.level, "debug");
    }
}
