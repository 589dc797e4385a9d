//! Session storage.
//!
//! Sessions live behind a small store abstraction so the engine's traversal
//! logic is independent of where state sits: in memory (the default), or in
//! a SQLite snapshot that survives restarts. No durability is promised by
//! the engine itself.

mod memory;
mod sqlite;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::Session;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed session storage with age-based reaping.
pub trait SessionStore: Send {
    /// Fetch a session by id.
    fn get(&self, id: &str) -> StoreResult<Option<Session>>;

    /// Insert or replace a session.
    fn put(&mut self, session: &Session) -> StoreResult<()>;

    /// Remove a session; returns whether it existed.
    fn delete(&mut self, id: &str) -> StoreResult<bool>;

    /// Remove sessions idle since before the cutoff; returns how many.
    fn sweep(&mut self, idle_cutoff: DateTime<Utc>) -> StoreResult<usize>;
}
