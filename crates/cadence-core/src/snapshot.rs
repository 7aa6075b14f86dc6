//! Snapshot persistence contract.
//!
//! Learned histograms and cache warm-start data are saved as JSON documents
//! under a string key. Callers treat every failure as "proceed degraded".

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{CadenceError, Result};

/// Key under which the learner persists its state.
pub const LEARNER_SNAPSHOT_KEY: &str = "learner";
/// Key under which the cache persists its warm-start entries.
pub const CACHE_SNAPSHOT_KEY: &str = "cache";

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Returns `Ok(None)` when nothing has been saved under `key` yet.
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>>;

    async fn save(&self, key: &str, snapshot: &serde_json::Value) -> Result<()>;
}

/// In-process store, used by tests and when no database is configured.
#[derive(Default)]
pub struct MemorySnapshotStore {
    docs: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let docs = self
            .docs
            .lock()
            .map_err(|_| CadenceError::Snapshot("memory store poisoned".into()))?;
        Ok(docs.get(key).cloned())
    }

    async fn save(&self, key: &str, snapshot: &serde_json::Value) -> Result<()> {
        let mut docs = self
            .docs
            .lock()
            .map_err(|_| CadenceError::Snapshot("memory store poisoned".into()))?;
        docs.insert(key.to_string(), snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemorySnapshotStore::new();
        assert!(store.load("learner").await.unwrap().is_none());
        store
            .save("learner", &serde_json::json!({"is_learning": false}))
            .await
            .unwrap();
        let doc = store.load("learner").await.unwrap().unwrap();
        assert_eq!(doc["is_learning"], false);
    }
}
