use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use cadence_core::{config::CacheConfig, SharedClock};
use cadence_hooks::{HookContext, HookEngine, HookEvent};
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::codec;
use crate::error::{CacheError, Result};
use crate::types::{
    CacheEntry, CacheSnapshot, CacheStats, CleanupReport, EntryMeta, SetOptions,
};

/// Compose the storage key from type and identifier.
pub fn cache_key(kind: &str, id: &str) -> String {
    format!("{kind}:{id}")
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
    compressions: u64,
    access_count: u64,
    access_micros: u128,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    total_size: usize,
    type_sizes: HashMap<String, usize>,
    counters: Counters,
}

impl CacheState {
    fn insert(&mut self, entry: CacheEntry) {
        self.total_size += entry.size;
        *self.type_sizes.entry(entry.kind.clone()).or_default() += entry.size;
        if let Some(old) = self.entries.insert(entry.key.clone(), entry) {
            self.account_removed(&old);
        }
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.account_removed(&entry);
        Some(entry)
    }

    fn account_removed(&mut self, entry: &CacheEntry) {
        self.total_size = self.total_size.saturating_sub(entry.size);
        if let Some(size) = self.type_sizes.get_mut(&entry.kind) {
            *size = size.saturating_sub(entry.size);
            if *size == 0 {
                self.type_sizes.remove(&entry.kind);
            }
        }
    }

    fn type_size(&self, kind: &str) -> usize {
        self.type_sizes.get(kind).copied().unwrap_or(0)
    }

    /// Key of the lowest usage-score entry, optionally restricted to one kind.
    /// Ties go to the least recently accessed.
    fn eviction_candidate(&self, kind: Option<&str>, now: DateTime<Utc>) -> Option<String> {
        self.entries
            .values()
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .min_by(|a, b| {
                a.usage_score(now)
                    .total_cmp(&b.usage_score(now))
                    .then(a.meta.last_access.cmp(&b.meta.last_access))
            })
            .map(|e| e.key.clone())
    }
}

/// Keyed, typed, TTL-bound result store with size budgets.
///
/// All bookkeeping sits behind one mutex; hooks are notified only after the
/// lock is released.
pub struct ResultCache {
    config: RwLock<CacheConfig>,
    clock: SharedClock,
    hooks: Arc<HookEngine>,
    state: Mutex<CacheState>,
}

impl ResultCache {
    pub fn new(config: CacheConfig, clock: SharedClock) -> Self {
        Self::with_hooks(config, clock, HookEngine::empty())
    }

    pub fn with_hooks(config: CacheConfig, clock: SharedClock, hooks: Arc<HookEngine>) -> Self {
        Self {
            config: RwLock::new(config),
            clock,
            hooks,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config.read().expect("cache config poisoned").clone()
    }

    fn ttl_for(&self, kind: &str) -> u64 {
        self.config.read().expect("cache config poisoned").ttl_for(kind)
    }

    /// Swap tunables in place, then sweep so shrunken budgets take effect.
    pub fn update_config(&self, config: CacheConfig) -> CleanupReport {
        *self.config.write().expect("cache config poisoned") = config;
        self.cleanup()
    }

    /// Store `value` under `kind:id`, evicting colder entries if a budget
    /// would be exceeded.
    pub fn set(
        &self,
        id: &str,
        kind: &str,
        value: &serde_json::Value,
        options: SetOptions,
    ) -> Result<()> {
        let config = self.config();
        let key = cache_key(kind, id);
        let encoded = codec::encode(
            value,
            config.compression_threshold_bytes,
            config.compression_level,
        )?;
        let size = encoded.data.len();

        let type_budget = config.budget_for(kind);
        if size > type_budget {
            warn!(%key, size, budget = type_budget, "cache entry larger than its budget");
            return Err(CacheError::CapacityExceeded {
                key,
                size,
                budget: type_budget,
            });
        }

        let now = self.clock.now();
        let mut evicted = Vec::new();
        {
            let mut state = self.state.lock().expect("cache state poisoned");
            // A replaced entry frees its own room first.
            state.remove(&key);

            if state.type_size(kind) + size > type_budget
                || state.total_size + size > config.total_budget_bytes
            {
                let purged = self.purge_expired(&mut state, &config, now);
                state.counters.expirations += purged as u64;
            }
            while state.type_size(kind) + size > type_budget {
                match state.eviction_candidate(Some(kind), now) {
                    Some(victim) => evicted.extend(state.remove(&victim)),
                    None => break,
                }
            }
            while state.total_size + size > config.total_budget_bytes {
                match state.eviction_candidate(None, now) {
                    Some(victim) => evicted.extend(state.remove(&victim)),
                    None => break,
                }
            }
            state.counters.evictions += evicted.len() as u64;
            if encoded.compressed {
                state.counters.compressions += 1;
            }

            state.insert(CacheEntry {
                key: key.clone(),
                kind: kind.to_string(),
                data: encoded.data,
                compressed: encoded.compressed,
                timestamp: now,
                size,
                meta: EntryMeta {
                    access_count: 0,
                    last_access: now,
                    tags: options.tags,
                    priority: options.priority,
                },
            });
        }

        debug!(%key, size, raw_size = encoded.raw_size, compressed = encoded.compressed, "cache set");
        self.notify_evicted(&evicted, "budget");
        Ok(())
    }

    pub fn set_json<T: Serialize>(
        &self,
        id: &str,
        kind: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set(id, kind, &value, options)
    }

    /// Fetch a live entry. Expired entries are removed and reported as a miss.
    pub fn get(&self, id: &str, kind: &str) -> Option<serde_json::Value> {
        let started = Instant::now();
        let ttl = self.ttl_for(kind);
        let key = cache_key(kind, id);
        let now = self.clock.now();

        let mut state = self.state.lock().expect("cache state poisoned");
        let Some(expired) = state.entries.get(&key).map(|e| e.is_expired(now, ttl)) else {
            state.counters.misses += 1;
            record_latency(&mut state.counters, started);
            return None;
        };
        if expired {
            state.remove(&key);
            state.counters.misses += 1;
            state.counters.expirations += 1;
            record_latency(&mut state.counters, started);
            debug!(%key, "cache entry expired on access");
            return None;
        }

        let decoded = {
            let entry = state.entries.get_mut(&key)?;
            entry.meta.access_count += 1;
            entry.meta.last_access = now;
            codec::decode(&entry.data, entry.compressed)
        };
        let result = match decoded {
            Ok(value) => {
                state.counters.hits += 1;
                Some(value)
            }
            Err(e) => {
                warn!(%key, error = %e, "dropping undecodable cache entry");
                state.remove(&key);
                state.counters.misses += 1;
                None
            }
        };
        record_latency(&mut state.counters, started);
        result
    }

    pub fn get_json<T: DeserializeOwned>(&self, id: &str, kind: &str) -> Option<T> {
        let value = self.get(id, kind)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(id, kind, error = %e, "cached value has unexpected shape");
                None
            }
        }
    }

    /// Existence and non-expiry check. Touches no bookkeeping.
    pub fn has(&self, id: &str, kind: &str) -> bool {
        let ttl = self.ttl_for(kind);
        let now = self.clock.now();
        let state = self.state.lock().expect("cache state poisoned");
        state
            .entries
            .get(&cache_key(kind, id))
            .is_some_and(|e| !e.is_expired(now, ttl))
    }

    /// Age of whatever is stored for `kind:id`, expired or not.
    pub fn age_of(&self, id: &str, kind: &str) -> Option<Duration> {
        let now = self.clock.now();
        let state = self.state.lock().expect("cache state poisoned");
        state
            .entries
            .get(&cache_key(kind, id))
            .map(|e| now - e.timestamp)
    }

    pub fn delete(&self, id: &str, kind: &str) -> bool {
        let mut state = self.state.lock().expect("cache state poisoned");
        state.remove(&cache_key(kind, id)).is_some()
    }

    /// Remove every entry carrying `tag`. Returns how many were removed.
    pub fn invalidate_by_tag(&self, tag: &str) -> usize {
        let mut state = self.state.lock().expect("cache state poisoned");
        let keys: Vec<String> = state
            .entries
            .values()
            .filter(|e| e.meta.tags.iter().any(|t| t == tag))
            .map(|e| e.key.clone())
            .collect();
        for key in &keys {
            state.remove(key);
        }
        keys.len()
    }

    pub fn keys_by_type(&self, kind: &str) -> Vec<String> {
        let state = self.state.lock().expect("cache state poisoned");
        let mut keys: Vec<String> = state
            .entries
            .values()
            .filter(|e| e.kind == kind)
            .map(|e| e.key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("cache state poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().expect("cache state poisoned");
        state.entries.clear();
        state.type_sizes.clear();
        state.total_size = 0;
    }

    /// Drop expired entries, then evict by usage score while over budget.
    pub fn cleanup(&self) -> CleanupReport {
        let config = self.config();
        let now = self.clock.now();
        let mut evicted = Vec::new();
        let expired;
        {
            let mut state = self.state.lock().expect("cache state poisoned");
            expired = self.purge_expired(&mut state, &config, now);
            state.counters.expirations += expired as u64;

            let kinds: Vec<String> = state.type_sizes.keys().cloned().collect();
            for kind in kinds {
                let budget = config.budget_for(&kind);
                while state.type_size(&kind) > budget {
                    match state.eviction_candidate(Some(&kind), now) {
                        Some(victim) => evicted.extend(state.remove(&victim)),
                        None => break,
                    }
                }
            }
            while state.total_size > config.total_budget_bytes {
                match state.eviction_candidate(None, now) {
                    Some(victim) => evicted.extend(state.remove(&victim)),
                    None => break,
                }
            }
            state.counters.evictions += evicted.len() as u64;
        }

        if expired > 0 || !evicted.is_empty() {
            debug!(expired, evicted = evicted.len(), "cache cleanup");
        }
        self.notify_evicted(&evicted, "cleanup");
        CleanupReport {
            expired,
            evicted: evicted.len(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().expect("cache state poisoned");
        let c = &state.counters;
        let lookups = c.hits + c.misses;
        CacheStats {
            hits: c.hits,
            misses: c.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                c.hits as f64 / lookups as f64
            },
            entries: state.entries.len(),
            total_size: state.total_size,
            type_sizes: state.type_sizes.clone(),
            avg_access_latency_us: if c.access_count == 0 {
                0.0
            } else {
                c.access_micros as f64 / c.access_count as f64
            },
            evictions: c.evictions,
            expirations: c.expirations,
            compressions: c.compressions,
        }
    }

    /// Live entries for warm start.
    pub fn snapshot(&self) -> CacheSnapshot {
        let config = self.config();
        let now = self.clock.now();
        let state = self.state.lock().expect("cache state poisoned");
        let mut entries: Vec<CacheEntry> = state
            .entries
            .values()
            .filter(|e| !e.is_expired(now, config.ttl_for(&e.kind)))
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        CacheSnapshot { entries }
    }

    /// Re-insert snapshot entries that are still live and still fit.
    /// Returns how many were restored.
    pub fn restore(&self, snapshot: CacheSnapshot) -> usize {
        let config = self.config();
        let now = self.clock.now();
        let mut state = self.state.lock().expect("cache state poisoned");
        let mut restored = 0;
        for entry in snapshot.entries {
            if entry.is_expired(now, config.ttl_for(&entry.kind)) {
                continue;
            }
            let fits_type =
                state.type_size(&entry.kind) + entry.size <= config.budget_for(&entry.kind);
            let fits_total = state.total_size + entry.size <= config.total_budget_bytes;
            if !fits_type || !fits_total || state.entries.contains_key(&entry.key) {
                continue;
            }
            state.insert(entry);
            restored += 1;
        }
        restored
    }

    fn purge_expired(&self, state: &mut CacheState, config: &CacheConfig, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = state
            .entries
            .values()
            .filter(|e| e.is_expired(now, config.ttl_for(&e.kind)))
            .map(|e| e.key.clone())
            .collect();
        for key in &expired {
            state.remove(key);
        }
        expired.len()
    }

    fn notify_evicted(&self, evicted: &[CacheEntry], reason: &str) {
        if self.hooks.is_empty() {
            return;
        }
        for entry in evicted {
            self.hooks.emit_after(HookContext::new(
                HookEvent::CacheEvicted,
                serde_json::json!({
                    "key": entry.key,
                    "size": entry.size,
                    "reason": reason,
                }),
            ));
        }
    }
}

fn record_latency(counters: &mut Counters, started: Instant) {
    counters.access_count += 1;
    counters.access_micros += started.elapsed().as_micros();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryPriority;
    use cadence_core::ManualClock;
    use serde_json::json;

    fn cache_with(config: CacheConfig) -> (ResultCache, Arc<ManualClock>) {
        let clock = ManualClock::new(Utc::now());
        (ResultCache::new(config, clock.clone()), clock)
    }

    #[test]
    fn set_then_get_returns_value() {
        let (cache, _) = cache_with(CacheConfig::default());
        cache
            .set("u1", "session", &json!({"cookie": "abc"}), SetOptions::default())
            .unwrap();
        assert_eq!(cache.get("u1", "session"), Some(json!({"cookie": "abc"})));
        assert!(cache.get("u1", "profile").is_none());
    }

    #[test]
    fn session_entries_expire_after_ttl() {
        let (cache, clock) = cache_with(CacheConfig::default());
        cache
            .set("u1", "session", &json!("v"), SetOptions::default())
            .unwrap();
        clock.advance(Duration::hours(24));
        assert!(cache.has("u1", "session"));
        clock.advance(Duration::seconds(1));
        assert!(!cache.has("u1", "session"));
        assert!(cache.get("u1", "session").is_none());
        // Lazy expiry removed it.
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn has_does_not_touch_bookkeeping() {
        let (cache, _) = cache_with(CacheConfig::default());
        cache.set("a", "listing", &json!(1), SetOptions::default()).unwrap();
        assert!(cache.has("a", "listing"));
        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 0);
    }

    #[test]
    fn total_budget_evicts_coldest() {
        let config = CacheConfig {
            total_budget_bytes: 40,
            type_budgets: HashMap::new(),
            compression_threshold_bytes: 10_000,
            ..CacheConfig::default()
        };
        let (cache, clock) = cache_with(config);
        // Each payload serializes to 12 bytes.
        cache.set("hot", "listing", &json!("0123456789"), SetOptions::default()).unwrap();
        cache.set("cold", "listing", &json!("0123456789"), SetOptions::default()).unwrap();
        cache.set("warm", "listing", &json!("0123456789"), SetOptions::default()).unwrap();
        clock.advance(Duration::seconds(30));
        for _ in 0..5 {
            cache.get("hot", "listing");
        }
        cache.get("warm", "listing");

        cache.set("new", "listing", &json!("0123456789"), SetOptions::default()).unwrap();
        assert!(cache.stats().total_size <= 40);
        assert!(cache.has("hot", "listing"));
        assert!(cache.has("warm", "listing"));
        assert!(!cache.has("cold", "listing"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn unread_high_priority_outlives_read_low_priority() {
        let config = CacheConfig {
            total_budget_bytes: 24,
            type_budgets: HashMap::new(),
            compression_threshold_bytes: 10_000,
            ..CacheConfig::default()
        };
        let (cache, clock) = cache_with(config);
        let high = SetOptions::default().with_priority(EntryPriority::High);
        let low = SetOptions::default().with_priority(EntryPriority::Low);
        cache.set("job-result", "listing", &json!("0123456789"), high).unwrap();
        cache.set("scratch", "listing", &json!("0123456789"), low).unwrap();
        clock.advance(Duration::seconds(1));
        cache.get("scratch", "listing");
        clock.advance(Duration::seconds(59));

        cache.set("new", "listing", &json!("0123456789"), SetOptions::default()).unwrap();
        assert!(cache.has("job-result", "listing"));
        assert!(!cache.has("scratch", "listing"));
    }

    #[test]
    fn type_budget_only_evicts_same_type() {
        let mut type_budgets = HashMap::new();
        type_budgets.insert("profile".to_string(), 24);
        let config = CacheConfig {
            total_budget_bytes: 1000,
            type_budgets,
            compression_threshold_bytes: 10_000,
            ..CacheConfig::default()
        };
        let (cache, _) = cache_with(config);
        cache.set("s", "session", &json!("0123456789"), SetOptions::default()).unwrap();
        cache.set("p1", "profile", &json!("0123456789"), SetOptions::default()).unwrap();
        cache.set("p2", "profile", &json!("0123456789"), SetOptions::default()).unwrap();
        cache.set("p3", "profile", &json!("0123456789"), SetOptions::default()).unwrap();

        let stats = cache.stats();
        assert!(stats.type_sizes["profile"] <= 24);
        assert!(cache.has("s", "session"));
        assert_eq!(cache.keys_by_type("profile").len(), 2);
    }

    #[test]
    fn oversized_entry_is_rejected() {
        let config = CacheConfig {
            total_budget_bytes: 8,
            compression_threshold_bytes: 10_000,
            ..CacheConfig::default()
        };
        let (cache, _) = cache_with(config);
        let err = cache
            .set("big", "listing", &json!("0123456789"), SetOptions::default())
            .unwrap_err();
        assert!(matches!(err, CacheError::CapacityExceeded { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn replacing_a_key_does_not_double_count() {
        let (cache, _) = cache_with(CacheConfig::default());
        cache.set("k", "listing", &json!("aaaa"), SetOptions::default()).unwrap();
        let before = cache.stats().total_size;
        cache.set("k", "listing", &json!("bbbb"), SetOptions::default()).unwrap();
        assert_eq!(cache.stats().total_size, before);
        assert_eq!(cache.get("k", "listing"), Some(json!("bbbb")));
    }

    #[test]
    fn compressed_round_trip_and_counter() {
        let config = CacheConfig {
            compression_threshold_bytes: 64,
            ..CacheConfig::default()
        };
        let (cache, _) = cache_with(config);
        let value = json!({"items": vec!["repeat me please"; 100]});
        cache.set("big", "listing", &value, SetOptions::default()).unwrap();
        assert_eq!(cache.stats().compressions, 1);
        assert_eq!(cache.get("big", "listing"), Some(value));
    }

    #[test]
    fn cleanup_removes_expired_and_respects_shrunk_budget() {
        let (cache, clock) = cache_with(CacheConfig {
            compression_threshold_bytes: 10_000,
            ..CacheConfig::default()
        });
        cache.set("l", "listing", &json!("0123456789"), SetOptions::default()).unwrap();
        cache.set("s1", "session", &json!("0123456789"), SetOptions::default()).unwrap();
        cache.set("s2", "session", &json!("0123456789"), SetOptions::default()).unwrap();
        clock.advance(Duration::hours(2));

        let report = cache.cleanup();
        assert_eq!(report.expired, 1);
        assert_eq!(cache.len(), 2);

        let report = cache.update_config(CacheConfig {
            total_budget_bytes: 12,
            compression_threshold_bytes: 10_000,
            ..CacheConfig::default()
        });
        assert_eq!(report.evicted, 1);
        assert!(cache.stats().total_size <= 12);
    }

    #[test]
    fn tags_invalidate_together() {
        let (cache, _) = cache_with(CacheConfig::default());
        let tagged = SetOptions::default().with_tag("user:42");
        cache.set("a", "profile", &json!(1), tagged.clone()).unwrap();
        cache.set("b", "listing", &json!(2), tagged).unwrap();
        cache.set("c", "listing", &json!(3), SetOptions::default()).unwrap();
        assert_eq!(cache.invalidate_by_tag("user:42"), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn hit_rate_is_tracked() {
        let (cache, _) = cache_with(CacheConfig::default());
        cache.set("a", "listing", &json!(1), SetOptions::default()).unwrap();
        cache.get("a", "listing");
        cache.get("missing", "listing");
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_restore_skips_expired() {
        let (cache, clock) = cache_with(CacheConfig::default());
        cache.set("l", "listing", &json!("x"), SetOptions::default()).unwrap();
        cache.set("s", "session", &json!("y"), SetOptions::default()).unwrap();
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.entries.len(), 2);

        let fresh = ResultCache::new(CacheConfig::default(), clock.clone());
        clock.advance(Duration::hours(2));
        assert_eq!(fresh.restore(snapshot), 1);
        assert_eq!(fresh.get("s", "session"), Some(json!("y")));
    }
}
