use crate::schema::{apply_connection_pragmas, init_schema};
use crate::{StoreError, StoreErrorCode};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Handle to the sqlite database. Cheap to share behind an `Arc`; every
/// operation takes the connection lock for its duration.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::new(
                        StoreErrorCode::Io,
                        format!("create data dir {}: {e}", parent.display()),
                    )
                })?;
            }
        }
        let conn = Connection::open(path)?;
        apply_connection_pragmas(&conn)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        // WAL is meaningless in memory but the rest of the pragmas apply.
        apply_connection_pragmas(&conn)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| {
            StoreError::new(
                StoreErrorCode::Internal,
                "store connection lock poisoned",
            )
        })
    }

    /// Liveness probe used by the readiness endpoint.
    pub fn ping(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        let version = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    pub fn meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT v FROM meta WHERE k = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO meta (k, v) VALUES (?1, ?2)",
            [key, value],
        )?;
        Ok(())
    }
}

// Uniform text encodings so lexicographic order matches chronological order.

pub(crate) fn ts_text(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::new(
                StoreErrorCode::Internal,
                format!("corrupt timestamp {raw:?}: {e}"),
            )
        })
}

pub(crate) fn date_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        StoreError::new(
            StoreErrorCode::Internal,
            format!("corrupt date {raw:?}: {e}"),
        )
    })
}

pub(crate) fn flag(value: bool) -> i64 {
    i64::from(value)
}

pub(crate) fn is_set(value: i64) -> bool {
    value != 0
}

/// Wraps a domain parse failure for use inside a rusqlite row mapper.
pub(crate) fn conv_err(
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn opens_and_reopens_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("timebank.sqlite");
        {
            let store = Store::open(&path).expect("open");
            store.set_meta("bootstrapped", "yes").expect("set meta");
            assert_eq!(store.schema_version().expect("version"), crate::SQLITE_SCHEMA_VERSION);
        }
        let store = Store::open(&path).expect("reopen");
        assert_eq!(store.meta("bootstrapped").expect("meta"), Some("yes".to_string()));
        store.ping().expect("ping");
    }

    #[test]
    fn timestamp_text_is_fixed_width_utc() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 5).single().expect("ts");
        let text = ts_text(ts);
        assert_eq!(text, "2026-03-01T08:30:05.000000Z");
        assert_eq!(parse_ts(&text).expect("parse"), ts);
    }

    #[test]
    fn later_timestamps_sort_later_as_text() {
        let early = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 5).single().expect("ts");
        let late = early + chrono::Duration::microseconds(1);
        assert!(ts_text(early) < ts_text(late));
    }
}
