//! Session persistence contract and the in-memory implementation.

use std::collections::HashMap;

use feedbridge_core::UserId;
use parking_lot::Mutex;

use crate::errors::Result;
use crate::state::Session;

/// Get/put access to persisted sessions, one record per user.
///
/// Each call is atomic per key. Implementations are shared between command
/// handlers and event projectors running on different tasks.
pub trait StateStore: Send + Sync {
    /// Load a user's session. A user without a record gets a fresh
    /// [`Session::new`].
    fn load(&self, user_id: UserId) -> Result<Session>;

    /// Insert or replace a user's session.
    fn save(&self, session: &Session) -> Result<()>;

    /// Every session with a credential, for starting push connections at boot.
    fn authorized(&self) -> Result<Vec<Session>>;
}

/// Volatile store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    sessions: Mutex<HashMap<UserId, Session>>,
}

impl MemoryStateStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, user_id: UserId) -> Result<Session> {
        Ok(self
            .sessions
            .lock()
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Session::new(user_id)))
    }

    fn save(&self, session: &Session) -> Result<()> {
        let _ = self
            .sessions
            .lock()
            .insert(session.user_id, session.clone());
        Ok(())
    }

    fn authorized(&self) -> Result<Vec<Session>> {
        let mut out: Vec<Session> = self
            .sessions
            .lock()
            .values()
            .filter(|s| s.is_authorized())
            .cloned()
            .collect();
        out.sort_by_key(|s| s.user_id);
        Ok(out)
    }
}
