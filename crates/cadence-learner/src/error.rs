use thiserror::Error;

#[derive(Debug, Error)]
pub enum LearnerError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Snapshot store error: {0}")]
    Store(#[from] cadence_core::CadenceError),

    #[error("Snapshot decode error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LearnerError>;
