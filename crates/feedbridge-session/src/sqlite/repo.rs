//! Session repository for the `sessions` table.
//!
//! One row per user keyed by the stringified [`UserId`]; the session itself
//! is stored as JSON in `data`.

use feedbridge_core::UserId;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::warn;

use crate::errors::Result;
use crate::state::Session;

/// Session repository. Stateless, every method takes `&Connection`.
pub struct SessionRepo;

impl SessionRepo {
    /// Fetch a user's session, or `None` if there is no row.
    ///
    /// A row that no longer decodes is logged and treated as missing.
    pub fn get(conn: &Connection, user_id: UserId) -> Result<Option<Session>> {
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM sessions WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data.and_then(|d| decode(user_id, &d)))
    }

    /// Insert or replace a user's session.
    pub fn upsert(conn: &Connection, session: &Session) -> Result<()> {
        let data = serde_json::to_string(session)?;
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO sessions (user_id, data, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![session.user_id.to_string(), data, now],
        )?;
        Ok(())
    }

    /// Every session carrying a credential, ordered by user id.
    pub fn list_authorized(conn: &Connection) -> Result<Vec<Session>> {
        let mut stmt = conn.prepare(
            "SELECT user_id, data FROM sessions
             WHERE json_extract(data, '$.credential') IS NOT NULL
             ORDER BY CAST(user_id AS INTEGER)",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(key, data)| {
                let user_id = key.parse().ok()?;
                decode(user_id, &data)
            })
            .filter(Session::is_authorized)
            .collect())
    }

    /// Number of stored sessions.
    pub fn count(conn: &Connection) -> Result<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?)
    }
}

fn decode(user_id: UserId, data: &str) -> Option<Session> {
    match serde_json::from_str::<Session>(data) {
        Ok(session) => Some(session),
        Err(e) => {
            warn!(%user_id, error = %e, "stored session does not decode, ignoring");
            None
        }
    }
}
