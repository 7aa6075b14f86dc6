use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for cadence_core::CadenceError {
    fn from(e: StoreError) -> Self {
        cadence_core::CadenceError::Snapshot(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
