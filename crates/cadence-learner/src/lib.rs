//! `cadence-learner`: adaptive interval learner.
//!
//! Activity signals feed two decayed histograms (24 hourly, 7 daily
//! buckets). The recent-window activity level scales each kind's base
//! interval, and confident per-hour success predictions cut it further:
//!
//! ```text
//! interval = clamp(base × activity multiplier × (1 − reduction),
//!                  1, base × max_adjustment_multiplier)
//! ```
//!
//! Only changes larger than the change threshold are handed to the scheduler.

pub mod error;
pub mod learner;
pub mod patterns;
pub mod types;

pub use error::{LearnerError, Result};
pub use learner::{adjust, AdaptiveLearner};
pub use types::{
    ActivityDataPoint, ActivityPatterns, AdaptiveStats, IntervalChange, LearnerSnapshot,
    OptimalHour, ScheduleEntry,
};
