//! SQLite-backed session snapshots.
//!
//! Optional durability: sessions are serialized to JSON and upserted on every
//! mutation, so a restarted process can resume or inspect them. Timestamps
//! are stored as RFC 3339 UTC strings, which compare lexicographically for
//! the sweep query.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{SessionStore, StoreResult};
use crate::models::Session;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    payload TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at);
"#;

/// Session store persisting snapshots to SQLite.
pub struct SqliteSessionStore {
    conn: Connection,
}

impl SqliteSessionStore {
    /// Open (or create) a snapshot database at the given path.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

impl SessionStore for SqliteSessionStore {
    fn get(&self, id: &str) -> StoreResult<Option<Session>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM sessions WHERE session_id = ?",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(Into::into))
            .transpose()
    }

    fn put(&mut self, session: &Session) -> StoreResult<()> {
        let payload = serde_json::to_string(session)?;
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO sessions (session_id, status, updated_at, payload)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                session.id,
                session.status.as_str(),
                session.updated_at.to_rfc3339(),
                payload,
            ],
        )?;
        Ok(())
    }

    fn delete(&mut self, id: &str) -> StoreResult<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM sessions WHERE session_id = ?", [id])?;
        Ok(rows > 0)
    }

    fn sweep(&mut self, idle_cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let rows = self.conn.execute(
            "DELETE FROM sessions WHERE updated_at < ?",
            [idle_cutoff.to_rfc3339()],
        )?;
        Ok(rows)
    }
}
