//! `cadence-core`: shared vocabulary for the cadence orchestration core.
//!
//! Holds what more than one component needs: configuration, the error
//! taxonomy, work kinds and priority bands, the shared scoring [`Context`],
//! the injectable [`Clock`], and the [`SnapshotStore`] persistence contract.

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod snapshot;
pub mod types;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::CadenceConfig;
pub use context::{Context, ContextSnapshot};
pub use error::{CadenceError, Result};
pub use snapshot::{MemorySnapshotStore, SnapshotStore};
pub use types::{
    ActivityLevel, ContextMode, DependencyHealth, IntervalScale, PriorityLevel, SystemLoad,
    WorkKind,
};
