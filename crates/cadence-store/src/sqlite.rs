use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use cadence_core::SnapshotStore;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use crate::{db::init_db, error::Result};

/// Metadata for one stored snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub key: String,
    pub size: usize,
    pub saved_at: String,
}

/// [`SnapshotStore`] backed by a single SQLite table.
pub struct SqliteSnapshotStore {
    db: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "snapshot store opened");
        Self::new(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let db = self.db.lock().expect("snapshot db poisoned");
        let body: Option<String> = db
            .query_row("SELECT body FROM snapshots WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    pub fn put(&self, key: &str, snapshot: &serde_json::Value) -> Result<usize> {
        let body = serde_json::to_string(snapshot)?;
        let size = body.len();
        let db = self.db.lock().expect("snapshot db poisoned");
        db.execute(
            "INSERT INTO snapshots (key, body, size, saved_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                body = excluded.body, size = excluded.size, saved_at = excluded.saved_at",
            rusqlite::params![key, body, size as i64, Utc::now().to_rfc3339()],
        )?;
        debug!(key, size, "snapshot saved");
        Ok(size)
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        let db = self.db.lock().expect("snapshot db poisoned");
        let n = db.execute("DELETE FROM snapshots WHERE key = ?1", [key])?;
        Ok(n > 0)
    }

    pub fn list(&self) -> Result<Vec<SnapshotInfo>> {
        let db = self.db.lock().expect("snapshot db poisoned");
        let mut stmt = db.prepare("SELECT key, size, saved_at FROM snapshots ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SnapshotInfo {
                    key: row.get(0)?,
                    size: row.get::<_, i64>(1)? as usize,
                    saved_at: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn load(&self, key: &str) -> cadence_core::Result<Option<serde_json::Value>> {
        Ok(self.get(key)?)
    }

    async fn save(&self, key: &str, snapshot: &serde_json::Value) -> cadence_core::Result<()> {
        self.put(key, snapshot)?;
        Ok(())
    }
}
