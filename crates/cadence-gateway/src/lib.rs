//! `cadence-gateway`: wires the scheduler, queue, cache and learner
//! together and exposes them over an HTTP control surface.
//!
//! Data flow for one timer fire:
//!
//! ```text
//! Scheduler ──fire──▶ QueuedHandler ──enqueue──▶ PriorityQueue
//!                                                   │ dequeue (score order)
//!                         ResultCache ◀──hit/store── Dispatcher ──▶ JobHandler
//!                                                   │ complete_task
//! AdaptiveLearner ◀──ExecutionRecord── Scheduler ◀──┘ (Context success rates)
//!        │ adapt_intervals
//!        └──IntervalScale──▶ Scheduler::apply_interval_scale
//! ```

pub mod app;
pub mod dispatch;
pub mod handlers;
pub mod http;
pub mod runtime;

pub use app::{build_router, AppState};
pub use runtime::{ActivitySignal, ConfigUpdate, Runtime, RuntimeChannels};
