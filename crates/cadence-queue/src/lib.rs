//! `cadence-queue`: multi-factor priority queue with aging.
//!
//! Every admitted task carries a composite score (see [`scoring`]). The
//! highest score is served first, ties go to the earliest admission, and
//! tasks left waiting gain a bounded aging boost so nothing starves.
//! Completion outcomes feed the shared success-rate history and, through
//! [`PriorityQueue::rebalance`], nudge the base-priority tables.

pub mod error;
pub mod queue;
pub mod scoring;
pub mod types;

pub use error::{QueueError, Result};
pub use queue::PriorityQueue;
pub use scoring::PriorityTables;
pub use types::{
    Admission, CompletionRecord, InFlightTask, QueueStats, Rebalance, ScoreBreakdown, Task, TaskResult,
    TaskSpec,
};
