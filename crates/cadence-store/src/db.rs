use rusqlite::{Connection, Result};

/// Initialise the snapshot table. Safe to call on every startup (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS snapshots (
            key         TEXT    NOT NULL PRIMARY KEY,
            body        TEXT    NOT NULL,   -- JSON document
            size        INTEGER NOT NULL,
            saved_at    TEXT    NOT NULL
        );",
    )
}
