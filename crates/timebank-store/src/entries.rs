// SPDX-License-Identifier: Apache-2.0

//! The allocation write path and entry listings.
//!
//! A logged amount of work arrives as a planned [`AllocationPlan`] plus the
//! shared entry metadata. The whole plan applies in one transaction: every
//! slice inserts one row, debits one bank, and moves its status; the
//! transaction re-reads each bank balance and fails with `conflict` when the
//! plan snapshot went stale. Partial allocation is unrepresentable.

use crate::banks::{bank_from_row, get_bank_tx, BANK_COLUMNS};
use crate::cursor::{decode_entry_cursor, encode_entry_cursor, EntryCursor, ENTRY_ORDER};
use crate::notifications::enqueue_draft_tx;
use crate::store::{conv_err, date_text, parse_date, parse_ts, ts_text};
use crate::{Store, StoreError, StoreErrorCode};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use timebank_model::{
    ClientId, EntryId, Hours, NotificationDraft, ProjectId, TimeEntry, Timebank, TimebankId,
    UserId,
};

/// Metadata shared by every slice a single log operation produces.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub work_date: NaiveDate,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationApplied {
    pub entries: Vec<TimeEntry>,
    /// Post-allocation state of every touched bank.
    pub banks: Vec<Timebank>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub client: Option<ClientId>,
    pub project: Option<ProjectId>,
    pub user: Option<UserId>,
    pub bank: Option<TimebankId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl EntryFilter {
    /// Stable digest binding cursors to the filter set that minted them.
    #[must_use]
    pub fn query_hash(&self) -> String {
        let canon = format!(
            "client={};project={};user={};bank={};from={};to={};order={ENTRY_ORDER}",
            self.client.map(|v| v.to_string()).unwrap_or_default(),
            self.project.map(|v| v.to_string()).unwrap_or_default(),
            self.user.map(|v| v.to_string()).unwrap_or_default(),
            self.bank.map(|v| v.to_string()).unwrap_or_default(),
            self.from.map(date_text).unwrap_or_default(),
            self.to.map(date_text).unwrap_or_default(),
        );
        timebank_core::sha256_hex(canon.as_bytes())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPage {
    pub items: Vec<TimeEntry>,
    pub next_cursor: Option<String>,
}

pub(crate) fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<TimeEntry> {
    let id: String = row.get("id")?;
    let client_id: String = row.get("client_id")?;
    let project_id: String = row.get("project_id")?;
    let timebank_id: String = row.get("timebank_id")?;
    let user_id: String = row.get("user_id")?;
    let work_date: String = row.get("work_date")?;
    let centihours: i64 = row.get("centihours")?;
    let note: Option<String> = row.get("note")?;
    let logged_at: String = row.get("logged_at")?;
    Ok(TimeEntry {
        id: EntryId::parse(&id).map_err(conv_err)?,
        client_id: ClientId::parse(&client_id).map_err(conv_err)?,
        project_id: ProjectId::parse(&project_id).map_err(conv_err)?,
        timebank_id: TimebankId::parse(&timebank_id).map_err(conv_err)?,
        user_id: UserId::parse(&user_id).map_err(conv_err)?,
        work_date: parse_date(&work_date).map_err(conv_err)?,
        hours: Hours::from_centihours(centihours),
        note,
        logged_at: parse_ts(&logged_at).map_err(conv_err)?,
    })
}

pub(crate) const ENTRY_COLUMNS: &str =
    "id, client_id, project_id, timebank_id, user_id, work_date, centihours, note, logged_at";

fn debit_bank_tx(
    tx: &Connection,
    bank_id: &TimebankId,
    hours: Hours,
    expected_remaining_before: Hours,
) -> Result<Timebank, StoreError> {
    let current = get_bank_tx(tx, bank_id)?;
    if current.remaining_hours != expected_remaining_before {
        return Err(StoreError::new(
            StoreErrorCode::Conflict,
            format!(
                "bank {bank_id} balance moved since planning: expected {} remaining, found {}",
                expected_remaining_before, current.remaining_hours
            ),
        ));
    }
    let next_used = current.used_hours + hours;
    let next_remaining = current.remaining_hours - hours;
    let next_status = timebank_ledger::next_status(current.status, next_remaining);
    tx.execute(
        "UPDATE timebanks SET used_centi = ?1, remaining_centi = ?2, status = ?3 WHERE id = ?4",
        params![
            next_used.centihours(),
            next_remaining.centihours(),
            next_status.as_str(),
            bank_id.to_string(),
        ],
    )?;
    get_bank_tx(tx, bank_id)
}

impl Store {
    /// Applies a whole allocation plan atomically, queueing the given
    /// notifications in the same transaction.
    pub fn apply_allocation(
        &self,
        client_id: &ClientId,
        draft: &EntryDraft,
        plan: &timebank_ledger::AllocationPlan,
        notifications: &[NotificationDraft],
        now: DateTime<Utc>,
    ) -> Result<AllocationApplied, StoreError> {
        if plan.slices.is_empty() {
            return Err(StoreError::validation("allocation plan has no slices"));
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let (project_client, project_active): (String, i64) = {
            let mut stmt =
                tx.prepare("SELECT client_id, active FROM projects WHERE id = ?1")?;
            let mut rows = stmt.query([draft.project_id.to_string()])?;
            match rows.next()? {
                Some(row) => (row.get(0)?, row.get(1)?),
                None => {
                    return Err(StoreError::not_found(format!(
                        "project {} not found",
                        draft.project_id
                    )))
                }
            }
        };
        if project_client != client_id.to_string() {
            return Err(StoreError::validation(format!(
                "project {} does not belong to client {client_id}",
                draft.project_id
            )));
        }
        if project_active == 0 {
            return Err(StoreError::validation(format!(
                "project {} is inactive",
                draft.project_id
            )));
        }

        let mut entries = Vec::with_capacity(plan.slices.len());
        let mut banks = Vec::with_capacity(plan.slices.len());
        for slice in &plan.slices {
            let bank = debit_bank_tx(&tx, &slice.bank_id, slice.hours, slice.remaining_before)?;
            if bank.client_id != *client_id {
                return Err(StoreError::validation(format!(
                    "bank {} does not belong to client {client_id}",
                    slice.bank_id
                )));
            }
            let entry = TimeEntry {
                id: EntryId::new(),
                client_id: *client_id,
                project_id: draft.project_id,
                timebank_id: slice.bank_id,
                user_id: draft.user_id,
                work_date: draft.work_date,
                hours: slice.hours,
                note: draft.note.clone(),
                logged_at: now,
            };
            tx.execute(
                "INSERT INTO time_entries (id, client_id, project_id, timebank_id, user_id, \
                 work_date, centihours, note, logged_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    entry.id.to_string(),
                    entry.client_id.to_string(),
                    entry.project_id.to_string(),
                    entry.timebank_id.to_string(),
                    entry.user_id.to_string(),
                    date_text(entry.work_date),
                    entry.hours.centihours(),
                    entry.note,
                    ts_text(now),
                ],
            )?;
            entries.push(entry);
            banks.push(bank);
        }

        for notification in notifications {
            enqueue_draft_tx(&tx, notification, now)?;
        }

        tx.commit()?;
        Ok(AllocationApplied { entries, banks })
    }

    pub fn get_entry(&self, id: &EntryId) -> Result<TimeEntry, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM time_entries WHERE id = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(entry_from_row(row)?),
            None => Err(StoreError::not_found(format!("entry {id} not found"))),
        }
    }

    /// Reverse allocation: removes the slice and credits its bank back,
    /// with the same status transition rules, in one transaction.
    pub fn delete_entry(&self, id: &EntryId) -> Result<Timebank, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let entry = {
            let sql = format!("SELECT {ENTRY_COLUMNS} FROM time_entries WHERE id = ?1");
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query([id.to_string()])?;
            match rows.next()? {
                Some(row) => entry_from_row(row)?,
                None => return Err(StoreError::not_found(format!("entry {id} not found"))),
            }
        };
        tx.execute("DELETE FROM time_entries WHERE id = ?1", [id.to_string()])?;

        let bank = get_bank_tx(&tx, &entry.timebank_id)?;
        let next_used = bank.used_hours - entry.hours;
        let next_remaining = bank.remaining_hours + entry.hours;
        let next_status = timebank_ledger::next_status(bank.status, next_remaining);
        tx.execute(
            "UPDATE timebanks SET used_centi = ?1, remaining_centi = ?2, status = ?3 WHERE id = ?4",
            params![
                next_used.centihours(),
                next_remaining.centihours(),
                next_status.as_str(),
                entry.timebank_id.to_string(),
            ],
        )?;
        let updated = get_bank_tx(&tx, &entry.timebank_id)?;
        tx.commit()?;
        Ok(updated)
    }

    /// `EXPLAIN QUERY PLAN` lines for the client-scoped listing. Diagnostic
    /// surface: tests and `timebank doctor` assert the covering index is
    /// actually used.
    pub fn explain_entry_list_plan(
        &self,
        filter: &EntryFilter,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        let mut sql = format!("SELECT {ENTRY_COLUMNS} FROM time_entries");
        let mut clauses: Vec<String> = Vec::new();
        let mut params_vec: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(client) = &filter.client {
            clauses.push("client_id = ?".to_string());
            params_vec.push(client.to_string().into());
        }
        if let Some(project) = &filter.project {
            clauses.push("project_id = ?".to_string());
            params_vec.push(project.to_string().into());
        }
        if let Some(user) = &filter.user {
            clauses.push("user_id = ?".to_string());
            params_vec.push(user.to_string().into());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY logged_at DESC, id DESC LIMIT 100");
        let explain_sql = format!("EXPLAIN QUERY PLAN {sql}");
        let mut stmt = conn.prepare(&explain_sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params_vec), |row| {
            row.get::<_, String>(3)
        })?;
        let mut lines = Vec::new();
        for row in rows {
            lines.push(row?);
        }
        Ok(lines)
    }

    /// Keyset-paginated listing, newest first. `cursor` must have been
    /// minted by a previous page of the same filter set.
    pub fn list_entries(
        &self,
        filter: &EntryFilter,
        limit: u32,
        cursor: Option<&str>,
        cursor_secret: &[u8],
    ) -> Result<EntryPage, StoreError> {
        let query_hash = filter.query_hash();
        let position = cursor
            .map(|token| decode_entry_cursor(token, cursor_secret, &query_hash))
            .transpose()
            .map_err(|e| StoreError::validation(e.to_string()))?;

        let conn = self.lock()?;
        let mut sql = format!("SELECT {ENTRY_COLUMNS} FROM time_entries");
        let mut clauses: Vec<String> = Vec::new();
        let mut params_vec: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(client) = &filter.client {
            clauses.push("client_id = ?".to_string());
            params_vec.push(client.to_string().into());
        }
        if let Some(project) = &filter.project {
            clauses.push("project_id = ?".to_string());
            params_vec.push(project.to_string().into());
        }
        if let Some(user) = &filter.user {
            clauses.push("user_id = ?".to_string());
            params_vec.push(user.to_string().into());
        }
        if let Some(bank) = &filter.bank {
            clauses.push("timebank_id = ?".to_string());
            params_vec.push(bank.to_string().into());
        }
        if let Some(from) = filter.from {
            clauses.push("work_date >= ?".to_string());
            params_vec.push(date_text(from).into());
        }
        if let Some(to) = filter.to {
            clauses.push("work_date <= ?".to_string());
            params_vec.push(date_text(to).into());
        }
        if let Some(pos) = &position {
            clauses.push("(logged_at < ? OR (logged_at = ? AND id < ?))".to_string());
            params_vec.push(pos.last_logged_at.clone().into());
            params_vec.push(pos.last_logged_at.clone().into());
            params_vec.push(pos.last_entry_id.clone().into());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY logged_at DESC, id DESC LIMIT ?");
        // Fetch one extra row to learn whether another page exists.
        params_vec.push((i64::from(limit) + 1).into());

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params_vec), entry_from_row)?;
        let mut items: Vec<TimeEntry> = Vec::new();
        for row in rows {
            items.push(row?);
        }
        let next_cursor = if items.len() > limit as usize {
            items.truncate(limit as usize);
            let last = items.last().ok_or_else(|| {
                StoreError::new(StoreErrorCode::Internal, "empty page with next cursor")
            })?;
            let payload = EntryCursor {
                order: ENTRY_ORDER.to_string(),
                last_logged_at: ts_text(last.logged_at),
                last_entry_id: last.id.to_string(),
                query_hash,
            };
            Some(
                encode_entry_cursor(&payload, cursor_secret)
                    .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?,
            )
        } else {
            None
        };
        Ok(EntryPage { items, next_cursor })
    }
}
