use crate::store::{parse_ts, ts_text};
use crate::users::user_from_row;
use crate::{Store, StoreError};
use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use timebank_model::{User, UserId};

/// Live bearer session. Only the token hash is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Store {
    pub fn create_session(
        &self,
        user_id: &UserId,
        token_hash: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        let session = Session {
            user_id: *user_id,
            created_at: now,
            expires_at: now + ttl,
        };
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO sessions (token_hash, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                token_hash,
                user_id.to_string(),
                ts_text(session.created_at),
                ts_text(session.expires_at),
            ],
        )?;
        Ok(session)
    }

    /// Resolves a bearer token hash to its user, sliding the expiry forward
    /// on every successful lookup. Expired and unknown tokens, and tokens
    /// belonging to deactivated users, all resolve to `None`.
    pub fn resolve_session(
        &self,
        token_hash: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        let expires_at: Option<String> = {
            let mut stmt =
                conn.prepare("SELECT expires_at FROM sessions WHERE token_hash = ?1")?;
            let mut rows = stmt.query([token_hash])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };
        let Some(raw_expiry) = expires_at else {
            return Ok(None);
        };
        if parse_ts(&raw_expiry)? <= now {
            conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?;
            return Ok(None);
        }

        let user = {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.email, u.name, u.role, u.client_id, u.active, u.created_at
                 FROM sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token_hash = ?1",
            )?;
            let mut rows = stmt.query([token_hash])?;
            match rows.next()? {
                Some(row) => user_from_row(row)?,
                None => return Ok(None),
            }
        };
        if !user.active {
            conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?;
            return Ok(None);
        }

        // Sliding renewal.
        conn.execute(
            "UPDATE sessions SET expires_at = ?1 WHERE token_hash = ?2",
            params![ts_text(now + ttl), token_hash],
        )?;
        Ok(Some(user))
    }

    pub fn delete_session(&self, token_hash: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?;
        Ok(())
    }

    /// Removes expired sessions; run from the background sweep.
    pub fn sweep_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            [ts_text(now)],
        )?;
        Ok(removed as u64)
    }
}
