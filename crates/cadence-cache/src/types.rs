use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Retention hint attached to an entry. Scales its eviction score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPriority {
    High,
    #[default]
    Normal,
    Low,
}

impl EntryPriority {
    pub fn multiplier(&self) -> f64 {
        match self {
            EntryPriority::High => 2.0,
            EntryPriority::Normal => 1.0,
            EntryPriority::Low => 0.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    pub tags: Vec<String>,
    pub priority: EntryPriority,
}

impl SetOptions {
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_priority(mut self, priority: EntryPriority) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMeta {
    pub access_count: u64,
    pub last_access: DateTime<Utc>,
    pub tags: Vec<String>,
    pub priority: EntryPriority,
}

/// A stored result. `data` is serialized JSON, zstd-compressed when `compressed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub kind: String,
    pub data: Vec<u8>,
    pub compressed: bool,
    pub timestamp: DateTime<Utc>,
    pub size: usize,
    pub meta: EntryMeta,
}

impl CacheEntry {
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.timestamp).num_seconds()
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl_secs: u64) -> bool {
        (now - self.timestamp).num_milliseconds() > (ttl_secs as i64) * 1000
    }

    /// How cold the entry is:
    /// `(time since last access / accesses per minute) / priority multiplier`.
    ///
    /// The write counts as one access, so a never-read entry is as cold as a
    /// once-read one of the same age and priority still scales it.
    pub fn idle_score(&self, now: DateTime<Utc>) -> f64 {
        let idle_ms = (now - self.meta.last_access).num_milliseconds().max(1) as f64;
        let age_minutes = ((now - self.timestamp).num_milliseconds() as f64 / 60_000.0)
            .max(1.0 / 60.0);
        let per_minute = self.meta.access_count.max(1) as f64 / age_minutes;
        idle_ms / per_minute / self.meta.priority.multiplier()
    }

    /// Reciprocal of [`idle_score`](Self::idle_score). The lowest usage score is
    /// evicted first.
    pub fn usage_score(&self, now: DateTime<Utc>) -> f64 {
        1.0 / self.idle_score(now)
    }
}

/// Counters and sizes exposed for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entries: usize,
    pub total_size: usize,
    pub type_sizes: HashMap<String, usize>,
    pub avg_access_latency_us: f64,
    pub evictions: u64,
    pub expirations: u64,
    pub compressions: u64,
}

/// Result of a periodic sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub expired: usize,
    pub evicted: usize,
}

/// Warm-start dump of live entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub entries: Vec<CacheEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(now: DateTime<Utc>, access_count: u64, idle_secs: i64, priority: EntryPriority) -> CacheEntry {
        CacheEntry {
            key: "listing:1".into(),
            kind: "listing".into(),
            data: vec![],
            compressed: false,
            timestamp: now - Duration::minutes(10),
            size: 0,
            meta: EntryMeta {
                access_count,
                last_access: now - Duration::seconds(idle_secs),
                tags: vec![],
                priority,
            },
        }
    }

    #[test]
    fn never_read_entries_keep_their_priority() {
        let now = Utc::now();
        let unread_high = entry(now, 0, 600, EntryPriority::High);
        let read_low = entry(now, 1, 540, EntryPriority::Low);
        assert!(unread_high.idle_score(now).is_finite());
        assert!(unread_high.usage_score(now) > read_low.usage_score(now));

        let unread = entry(now, 0, 600, EntryPriority::Normal);
        let ratio = unread.idle_score(now) / unread_high.idle_score(now);
        assert!((ratio - 2.0).abs() < 1e-9);
    }

    #[test]
    fn hot_entries_outscore_cold_ones() {
        let now = Utc::now();
        let hot = entry(now, 50, 5, EntryPriority::Normal);
        let cold = entry(now, 2, 500, EntryPriority::Normal);
        assert!(hot.usage_score(now) > cold.usage_score(now));
    }

    #[test]
    fn priority_scales_score() {
        let now = Utc::now();
        let high = entry(now, 5, 60, EntryPriority::High);
        let normal = entry(now, 5, 60, EntryPriority::Normal);
        let low = entry(now, 5, 60, EntryPriority::Low);
        assert!(high.usage_score(now) > normal.usage_score(now));
        assert!(normal.usage_score(now) > low.usage_score(now));
        let ratio = normal.idle_score(now) / high.idle_score(now);
        assert!((ratio - 2.0).abs() < 1e-9);
    }
}
