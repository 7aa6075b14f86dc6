//! `cadence-store`: SQLite persistence for learner and cache snapshots.

pub mod db;
pub mod error;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use sqlite::{SnapshotInfo, SqliteSnapshotStore};
