use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Malformed job spec: missing handler, unknown kind, bad interval.
    #[error("Invalid job: {0}")]
    Validation(String),

    /// No job with the given ID is registered.
    #[error("Job not found: {id}")]
    JobNotFound { id: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
