use thiserror::Error;

#[derive(Debug, Error)]
pub enum CadenceError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed job or task definition, rejected before it enters the system.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Job not found: {id}")]
    JobNotFound { id: String },

    #[error("Task not found: {id}")]
    TaskNotFound { id: String },

    /// Queue or cache is over budget and eviction could not reclaim enough room.
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Snapshot store error: {0}")]
    Snapshot(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CadenceError {
    /// Short error code string returned by the control surface.
    pub fn code(&self) -> &'static str {
        match self {
            CadenceError::Config(_) => "CONFIG_ERROR",
            CadenceError::Validation(_) => "VALIDATION_ERROR",
            CadenceError::JobNotFound { .. } => "JOB_NOT_FOUND",
            CadenceError::TaskNotFound { .. } => "TASK_NOT_FOUND",
            CadenceError::CapacityExceeded(_) => "CAPACITY_EXCEEDED",
            CadenceError::Snapshot(_) => "SNAPSHOT_ERROR",
            CadenceError::Serialization(_) => "SERIALIZATION_ERROR",
            CadenceError::Io(_) => "IO_ERROR",
            CadenceError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, CadenceError>;
