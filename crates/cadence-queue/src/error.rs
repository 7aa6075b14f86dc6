use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    /// Malformed task spec, rejected before admission.
    #[error("Invalid task: {0}")]
    Validation(String),

    /// The queue is full and the newcomer does not outrank the lowest task.
    #[error("Queue full ({max_size} tasks); score {score:.3} does not outrank {lowest:.3}")]
    CapacityExceeded {
        max_size: usize,
        score: f64,
        lowest: f64,
    },

    #[error("Task not in flight: {id}")]
    TaskNotFound { id: String },
}

pub type Result<T> = std::result::Result<T, QueueError>;
