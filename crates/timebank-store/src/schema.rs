// SPDX-License-Identifier: Apache-2.0

use crate::StoreError;
use rusqlite::Connection;

pub const SQLITE_SCHEMA_VERSION: i64 = 1;

pub(crate) fn apply_connection_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        PRAGMA foreign_keys=ON;
        PRAGMA temp_store=MEMORY;
        PRAGMA cache_size=-16000;
        PRAGMA busy_timeout=5000;
        ",
    )?;
    Ok(())
}

pub(crate) fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    let user_version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if user_version == SQLITE_SCHEMA_VERSION {
        return Ok(());
    }
    if user_version != 0 {
        return Err(StoreError::validation(format!(
            "database schema version {user_version} is not supported (expected {SQLITE_SCHEMA_VERSION})"
        )));
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS meta (
          k TEXT PRIMARY KEY,
          v TEXT NOT NULL
        ) WITHOUT ROWID;

        CREATE TABLE IF NOT EXISTS clients (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          contact_email TEXT NOT NULL,
          warn_threshold_pct INTEGER NOT NULL CHECK (warn_threshold_pct BETWEEN 1 AND 99),
          notify_on_entry INTEGER NOT NULL DEFAULT 0,
          active INTEGER NOT NULL DEFAULT 1,
          created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
          id TEXT PRIMARY KEY,
          email TEXT NOT NULL UNIQUE,
          name TEXT NOT NULL,
          role TEXT NOT NULL,
          client_id TEXT REFERENCES clients(id),
          password_hash TEXT NOT NULL,
          active INTEGER NOT NULL DEFAULT 1,
          created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS projects (
          id TEXT PRIMARY KEY,
          client_id TEXT NOT NULL REFERENCES clients(id),
          name TEXT NOT NULL,
          active INTEGER NOT NULL DEFAULT 1,
          created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS timebanks (
          id TEXT PRIMARY KEY,
          client_id TEXT NOT NULL REFERENCES clients(id),
          name TEXT NOT NULL,
          purchased_centi INTEGER NOT NULL,
          used_centi INTEGER NOT NULL DEFAULT 0,
          remaining_centi INTEGER NOT NULL,
          status TEXT NOT NULL DEFAULT 'active',
          purchased_at TEXT NOT NULL,
          created_at TEXT NOT NULL,
          CHECK (purchased_centi - used_centi = remaining_centi)
        );

        CREATE TABLE IF NOT EXISTS time_entries (
          id TEXT PRIMARY KEY,
          client_id TEXT NOT NULL REFERENCES clients(id),
          project_id TEXT NOT NULL REFERENCES projects(id),
          timebank_id TEXT NOT NULL REFERENCES timebanks(id),
          user_id TEXT NOT NULL REFERENCES users(id),
          work_date TEXT NOT NULL,
          centihours INTEGER NOT NULL CHECK (centihours > 0),
          note TEXT,
          logged_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS invitations (
          id TEXT PRIMARY KEY,
          email TEXT NOT NULL,
          role TEXT NOT NULL,
          client_id TEXT REFERENCES clients(id),
          status TEXT NOT NULL DEFAULT 'pending',
          token_hash TEXT NOT NULL UNIQUE,
          invited_by TEXT NOT NULL REFERENCES users(id),
          created_at TEXT NOT NULL,
          expires_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
          token_hash TEXT PRIMARY KEY,
          user_id TEXT NOT NULL REFERENCES users(id),
          created_at TEXT NOT NULL,
          expires_at TEXT NOT NULL
        ) WITHOUT ROWID;

        CREATE TABLE IF NOT EXISTS notifications (
          id TEXT PRIMARY KEY,
          kind TEXT NOT NULL,
          dedupe_key TEXT NOT NULL,
          recipient TEXT NOT NULL,
          subject TEXT NOT NULL,
          body TEXT NOT NULL,
          status TEXT NOT NULL DEFAULT 'queued',
          attempts INTEGER NOT NULL DEFAULT 0,
          last_error TEXT,
          next_attempt_at TEXT NOT NULL,
          created_at TEXT NOT NULL,
          sent_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_users_role ON users(role, active);
        CREATE INDEX IF NOT EXISTS idx_users_client ON users(client_id, active);
        CREATE INDEX IF NOT EXISTS idx_projects_client ON projects(client_id, active);
        CREATE INDEX IF NOT EXISTS idx_banks_client ON timebanks(client_id, status);
        CREATE INDEX IF NOT EXISTS idx_entries_client_logged
          ON time_entries(client_id, logged_at, id);
        CREATE INDEX IF NOT EXISTS idx_entries_project ON time_entries(project_id, work_date);
        CREATE INDEX IF NOT EXISTS idx_entries_user ON time_entries(user_id, work_date);
        CREATE INDEX IF NOT EXISTS idx_entries_bank ON time_entries(timebank_id);
        CREATE INDEX IF NOT EXISTS idx_invitations_email ON invitations(email, status);
        CREATE INDEX IF NOT EXISTS idx_invitations_status ON invitations(status, expires_at);
        CREATE INDEX IF NOT EXISTS idx_sessions_expiry ON sessions(expires_at);
        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
        CREATE INDEX IF NOT EXISTS idx_notifications_due
          ON notifications(status, next_attempt_at);
        CREATE INDEX IF NOT EXISTS idx_notifications_dedupe
          ON notifications(dedupe_key, status);
        CREATE INDEX IF NOT EXISTS idx_notifications_created
          ON notifications(created_at, id);
        ",
    )?;
    conn.execute_batch(&format!("PRAGMA user_version={SQLITE_SCHEMA_VERSION};"))?;
    conn.execute(
        "INSERT OR REPLACE INTO meta (k, v) VALUES ('schema_version', ?1)",
        [SQLITE_SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}
