use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// zstd failed to compress or decompress a payload.
    #[error("Compression error: {0}")]
    Compression(#[from] std::io::Error),

    /// The entry cannot fit even after evicting everything evictable.
    #[error("Capacity exceeded for {key}: {size} bytes (budget {budget})")]
    CapacityExceeded {
        key: String,
        size: usize,
        budget: usize,
    },
}

pub type Result<T> = std::result::Result<T, CacheError>;
