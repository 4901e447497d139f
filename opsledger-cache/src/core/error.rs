use thiserror::Error;

/// Main error type for cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Durable store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Schema setup failed: {0}")]
    Schema(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
