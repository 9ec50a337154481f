//! `SQLite`-backed [`StateStore`].

pub mod connection;
pub mod migrations;
pub mod repo;

use std::path::Path;

use feedbridge_core::UserId;
use tracing::info;

use crate::errors::Result;
use crate::state::Session;
use crate::store::StateStore;

pub use connection::{ConnectionConfig, ConnectionPool};
pub use repo::SessionRepo;

/// Session store on an r2d2 pool of `SQLite` connections.
#[derive(Clone, Debug)]
pub struct SqliteStateStore {
    pool: ConnectionPool,
}

impl SqliteStateStore {
    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: &Path, config: &ConnectionConfig) -> Result<Self> {
        let pool = connection::new_file(path, config)?;
        let store = Self::from_pool(pool)?;
        info!(path = %path.display(), "session store opened");
        Ok(store)
    }

    /// Volatile database, for tests.
    pub fn in_memory() -> Result<Self> {
        Self::from_pool(connection::new_in_memory()?)
    }

    /// Wrap an existing pool and run migrations on it.
    pub fn from_pool(pool: ConnectionPool) -> Result<Self> {
        let conn = pool.get()?;
        let _ = migrations::run_migrations(&conn)?;
        drop(conn);
        Ok(Self { pool })
    }
}

impl StateStore for SqliteStateStore {
    fn load(&self, user_id: UserId) -> Result<Session> {
        let conn = self.pool.get()?;
        Ok(SessionRepo::get(&conn, user_id)?.unwrap_or_else(|| Session::new(user_id)))
    }

    fn save(&self, session: &Session) -> Result<()> {
        let conn = self.pool.get()?;
        SessionRepo::upsert(&conn, session)
    }

    fn authorized(&self) -> Result<Vec<Session>> {
        let conn = self.pool.get()?;
        SessionRepo::list_authorized(&conn)
    }
}
