//! In-memory session store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{SessionStore, StoreResult};
use crate::models::Session;

/// The default store: a plain map, no durability.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: HashMap<String, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, id: &str) -> StoreResult<Option<Session>> {
        Ok(self.sessions.get(id).cloned())
    }

    fn put(&mut self, session: &Session) -> StoreResult<()> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn delete(&mut self, id: &str) -> StoreResult<bool> {
        Ok(self.sessions.remove(id).is_some())
    }

    fn sweep(&mut self, idle_cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.updated_at >= idle_cutoff);
        Ok(before - self.sessions.len())
    }
}
