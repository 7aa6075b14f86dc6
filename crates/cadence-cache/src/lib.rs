//! `cadence-cache`: layered result cache.
//!
//! Entries are keyed by `type:identifier`, expire after a per-type TTL, and
//! are bounded by a total and per-type byte budget. When room is needed the
//! entry with the lowest usage score goes first:
//!
//! ```text
//! idle  = (ms since last access / accesses per minute) / priority multiplier
//! usage = 1 / idle            (never-read entries score 0)
//! ```
//!
//! Payloads above the compression threshold are stored zstd-compressed.

pub mod codec;
pub mod error;
pub mod manager;
pub mod types;

pub use error::{CacheError, Result};
pub use manager::{cache_key, ResultCache};
pub use types::{
    CacheEntry, CacheSnapshot, CacheStats, CleanupReport, EntryMeta, EntryPriority, SetOptions,
};
