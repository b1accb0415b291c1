// SPDX-License-Identifier: Apache-2.0

//! Notification outbox.
//!
//! Messages are queued as rows in the same transaction as the change that
//! caused them; a dispatch loop in `timebank-notify` delivers them later.
//! Enqueueing a dedupe key that already has a live (queued) row is a no-op.

use crate::store::{conv_err, parse_ts, ts_text};
use crate::{Store, StoreError};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, Row};
use timebank_model::{
    EmailAddress, Notification, NotificationDraft, NotificationId, NotificationKind,
    NotificationStatus,
};

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    let id: String = row.get("id")?;
    let kind: String = row.get("kind")?;
    let dedupe_key: String = row.get("dedupe_key")?;
    let recipient: String = row.get("recipient")?;
    let subject: String = row.get("subject")?;
    let body: String = row.get("body")?;
    let status: String = row.get("status")?;
    let attempts: i64 = row.get("attempts")?;
    let last_error: Option<String> = row.get("last_error")?;
    let created_at: String = row.get("created_at")?;
    let sent_at: Option<String> = row.get("sent_at")?;
    Ok(Notification {
        id: NotificationId::parse(&id).map_err(conv_err)?,
        kind: NotificationKind::parse(&kind).map_err(conv_err)?,
        dedupe_key,
        recipient: EmailAddress::parse(&recipient).map_err(conv_err)?,
        subject,
        body,
        status: NotificationStatus::parse(&status).map_err(conv_err)?,
        attempts: u32::try_from(attempts.max(0)).unwrap_or(u32::MAX),
        last_error,
        created_at: parse_ts(&created_at).map_err(conv_err)?,
        sent_at: sent_at.map(|raw| parse_ts(&raw).map_err(conv_err)).transpose()?,
    })
}

const NOTIFICATION_COLUMNS: &str = "id, kind, dedupe_key, recipient, subject, body, status, \
     attempts, last_error, created_at, sent_at";

/// Queues one draft inside an open transaction. Returns the new id, or
/// `None` when a queued row with the same dedupe key already exists.
pub(crate) fn enqueue_draft_tx(
    conn: &Connection,
    draft: &NotificationDraft,
    now: DateTime<Utc>,
) -> Result<Option<NotificationId>, StoreError> {
    let live: i64 = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE dedupe_key = ?1 AND status = 'queued'",
        [&draft.dedupe_key],
        |row| row.get(0),
    )?;
    if live > 0 {
        return Ok(None);
    }
    let id = NotificationId::new();
    conn.execute(
        "INSERT INTO notifications (id, kind, dedupe_key, recipient, subject, body, status, \
         attempts, last_error, next_attempt_at, created_at, sent_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'queued', 0, NULL, ?7, ?7, NULL)",
        params![
            id.to_string(),
            draft.kind.as_str(),
            draft.dedupe_key,
            draft.recipient.as_str(),
            draft.subject,
            draft.body,
            ts_text(now),
        ],
    )?;
    Ok(Some(id))
}

impl Store {
    pub fn enqueue_notification(
        &self,
        draft: &NotificationDraft,
        now: DateTime<Utc>,
    ) -> Result<Option<NotificationId>, StoreError> {
        let conn = self.lock()?;
        enqueue_draft_tx(&conn, draft, now)
    }

    /// Queued messages whose next attempt is due, oldest first.
    pub fn due_notifications(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Notification>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE status = 'queued' AND next_attempt_at <= ?1
             ORDER BY next_attempt_at, id LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![ts_text(now), i64::from(limit)],
            notification_from_row,
        )?;
        let mut due = Vec::new();
        for row in rows {
            due.push(row?);
        }
        Ok(due)
    }

    pub fn mark_notification_sent(
        &self,
        id: &NotificationId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE notifications
             SET status = 'sent', attempts = attempts + 1, last_error = NULL, sent_at = ?1
             WHERE id = ?2",
            params![ts_text(now), id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found(format!(
                "notification {id} not found"
            )));
        }
        Ok(())
    }

    /// Records a delivery failure. The message stays queued with a pushed-out
    /// next attempt until `max_attempts` is reached, then moves to `failed`.
    pub fn mark_notification_failed(
        &self,
        id: &NotificationId,
        error: &str,
        retry_in: Option<Duration>,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<NotificationStatus, StoreError> {
        let conn = self.lock()?;
        let attempts: i64 = conn.query_row(
            "SELECT attempts FROM notifications WHERE id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )?;
        let next_attempts = attempts + 1;
        let exhausted =
            next_attempts >= i64::from(max_attempts) || retry_in.is_none();
        let status = if exhausted {
            NotificationStatus::Failed
        } else {
            NotificationStatus::Queued
        };
        let next_attempt_at = now + retry_in.unwrap_or_else(Duration::zero);
        conn.execute(
            "UPDATE notifications
             SET status = ?1, attempts = ?2, last_error = ?3, next_attempt_at = ?4
             WHERE id = ?5",
            params![
                status.as_str(),
                next_attempts,
                error,
                ts_text(next_attempt_at),
                id.to_string(),
            ],
        )?;
        Ok(status)
    }

    /// Delivery log, newest first.
    pub fn list_notifications(
        &self,
        status: Option<NotificationStatus>,
        limit: u32,
    ) -> Result<Vec<Notification>, StoreError> {
        let conn = self.lock()?;
        let mut sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications");
        let mut params_vec: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(status) = status {
            sql.push_str(" WHERE status = ?");
            params_vec.push(status.as_str().to_string().into());
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");
        params_vec.push(i64::from(limit).into());
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(params_vec),
            notification_from_row,
        )?;
        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }
        Ok(notifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(key: &str) -> NotificationDraft {
        NotificationDraft {
            kind: NotificationKind::DepletionWarning,
            dedupe_key: key.to_string(),
            recipient: EmailAddress::parse("ops@acme.example").expect("email"),
            subject: "Timebank running low".to_string(),
            body: "8.00 of 40.00 hours remain".to_string(),
        }
    }

    #[test]
    fn live_dedupe_key_enqueues_once() {
        let store = Store::open_in_memory().expect("store");
        let now = Utc::now();
        let first = store
            .enqueue_notification(&draft("depletion:b1:warning"), now)
            .expect("first");
        assert!(first.is_some());
        let second = store
            .enqueue_notification(&draft("depletion:b1:warning"), now)
            .expect("second");
        assert!(second.is_none());
        assert_eq!(store.due_notifications(now, 10).expect("due").len(), 1);
    }

    #[test]
    fn sent_key_can_fire_again_later() {
        let store = Store::open_in_memory().expect("store");
        let now = Utc::now();
        let id = store
            .enqueue_notification(&draft("depletion:b1:warning"), now)
            .expect("enqueue")
            .expect("id");
        store.mark_notification_sent(&id, now).expect("sent");
        let again = store
            .enqueue_notification(&draft("depletion:b1:warning"), now)
            .expect("re-enqueue");
        assert!(again.is_some());
    }

    #[test]
    fn failures_back_off_then_exhaust() {
        let store = Store::open_in_memory().expect("store");
        let now = Utc::now();
        let id = store
            .enqueue_notification(&draft("depletion:b2:warning"), now)
            .expect("enqueue")
            .expect("id");

        let status = store
            .mark_notification_failed(&id, "relay 502", Some(Duration::minutes(5)), 3, now)
            .expect("fail 1");
        assert_eq!(status, NotificationStatus::Queued);
        // Not due until the backoff elapses.
        assert!(store.due_notifications(now, 10).expect("due").is_empty());
        assert_eq!(
            store
                .due_notifications(now + Duration::minutes(6), 10)
                .expect("due later")
                .len(),
            1
        );

        store
            .mark_notification_failed(&id, "relay 502", Some(Duration::minutes(5)), 3, now)
            .expect("fail 2");
        let status = store
            .mark_notification_failed(&id, "relay 502", Some(Duration::minutes(5)), 3, now)
            .expect("fail 3");
        assert_eq!(status, NotificationStatus::Failed);

        let failed = store
            .list_notifications(Some(NotificationStatus::Failed), 10)
            .expect("failed list");
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].attempts, 3);
        assert_eq!(failed[0].last_error.as_deref(), Some("relay 502"));
    }
}
