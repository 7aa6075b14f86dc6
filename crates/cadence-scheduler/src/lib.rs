//! `cadence-scheduler`: recurring job scheduler with jitter and failure containment.
//!
//! # Overview
//!
//! Jobs are registered from a [`JobSpec`] naming a handler in the
//! [`HandlerRegistry`]. The [`Scheduler`] ticks on a fixed cadence and fires
//! each job whose `next_run` has arrived.
//!
//! # Firing rules
//!
//! | Rule            | Behaviour                                                  |
//! |-----------------|------------------------------------------------------------|
//! | Jitter          | interval = nominal × (1 ± `jitter_fraction`), at least 1 min |
//! | First fire      | delayed by a per-priority offset                           |
//! | Active window   | fires outside the hours/days window are skipped            |
//! | Non-concurrent  | skipped while a previous execution is in flight            |
//! | Concurrent      | bounded by a global `max_concurrent`                       |
//! | Failures        | `max_retries` failures disable the job for `cooldown_minutes` |

pub mod engine;
pub mod error;
pub mod handler;
pub mod timing;
pub mod types;

pub use engine::{Scheduler, TickReport};
pub use error::{Result, SchedulerError};
pub use handler::{handler_fn, FnHandler, HandlerRegistry, JobContext, JobHandler, JobOutcome};
pub use types::{
    ExecutionRecord, FireOutcome, Job, JobSpec, JobStatus, JobView, SchedulerStats, SkipReason,
};
