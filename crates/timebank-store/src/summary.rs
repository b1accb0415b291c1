// SPDX-License-Identifier: Apache-2.0

//! Dashboard aggregates: per-client totals, bank breakdowns, and the
//! date-ranged statement rows the CSV export renders.

use crate::banks::{bank_from_row, BANK_COLUMNS};
use crate::entries::{entry_from_row, ENTRY_COLUMNS};
use crate::store::{conv_err, date_text, parse_date};
use crate::{Store, StoreError};
use chrono::NaiveDate;
use serde::Serialize;
use timebank_model::{
    Client, ClientId, EmailAddress, Hours, Project, TimeEntry, Timebank, TimebankId,
    TimebankName, TimebankStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankBreakdown {
    pub bank: Timebank,
    pub entry_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub client: Client,
    pub purchased: Hours,
    pub used: Hours,
    pub remaining: Hours,
    pub banks: Vec<BankBreakdown>,
    pub projects: Vec<Project>,
    pub recent_entries: Vec<TimeEntry>,
}

/// One line of a client statement, denormalized for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementRow {
    pub work_date: NaiveDate,
    pub project: String,
    pub person: String,
    pub bank: String,
    pub hours: Hours,
    pub note: Option<String>,
}

/// Bank plus the client settings the depletion re-scan needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepletionScanRow {
    pub bank: Timebank,
    pub client_name: String,
    pub contact_email: EmailAddress,
    pub warn_threshold_pct: u8,
}

impl Store {
    pub fn client_summary(
        &self,
        id: &ClientId,
        recent_limit: u32,
    ) -> Result<ClientSummary, StoreError> {
        let client = self.get_client(id)?;

        let conn = self.lock()?;
        let sql = format!(
            "SELECT {BANK_COLUMNS},
                    (SELECT COUNT(*) FROM time_entries e WHERE e.timebank_id = timebanks.id)
                      AS entry_count
             FROM timebanks WHERE client_id = ?1
             ORDER BY purchased_at, id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([id.to_string()], |row| {
            let bank = bank_from_row(row)?;
            let entry_count: i64 = row.get("entry_count")?;
            Ok(BankBreakdown {
                bank,
                entry_count: entry_count.max(0) as u64,
            })
        })?;
        let mut banks = Vec::new();
        for row in rows {
            banks.push(row?);
        }
        drop(stmt);
        drop(conn);

        // Closed banks still count toward historical totals.
        let mut purchased = Hours::ZERO;
        let mut used = Hours::ZERO;
        let mut remaining = Hours::ZERO;
        for item in &banks {
            purchased += item.bank.purchased_hours;
            used += item.bank.used_hours;
            remaining += item.bank.remaining_hours;
        }

        let projects = self.list_projects(Some(id), true, 500)?;
        let page = self.list_entries(
            &crate::EntryFilter {
                client: Some(*id),
                ..crate::EntryFilter::default()
            },
            recent_limit,
            None,
            b"summary-inline",
        )?;

        Ok(ClientSummary {
            client,
            purchased,
            used,
            remaining,
            banks,
            projects,
            recent_entries: page.items,
        })
    }

    /// Statement lines for the CSV export, oldest work first.
    pub fn statement_rows(
        &self,
        client: &ClientId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<StatementRow>, StoreError> {
        let conn = self.lock()?;
        let mut sql = "SELECT e.work_date, p.name AS project, u.name AS person, \
             b.name AS bank, e.centihours, e.note
             FROM time_entries e
             JOIN projects p ON p.id = e.project_id
             JOIN users u ON u.id = e.user_id
             JOIN timebanks b ON b.id = e.timebank_id
             WHERE e.client_id = ?"
            .to_string();
        let mut params_vec: Vec<rusqlite::types::Value> = vec![client.to_string().into()];
        if let Some(from) = from {
            sql.push_str(" AND e.work_date >= ?");
            params_vec.push(date_text(from).into());
        }
        if let Some(to) = to {
            sql.push_str(" AND e.work_date <= ?");
            params_vec.push(date_text(to).into());
        }
        sql.push_str(" ORDER BY e.work_date, e.logged_at, e.id");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params_vec), |row| {
            let work_date: String = row.get("work_date")?;
            let project: String = row.get("project")?;
            let person: String = row.get("person")?;
            let bank: String = row.get("bank")?;
            let centihours: i64 = row.get("centihours")?;
            let note: Option<String> = row.get("note")?;
            Ok(StatementRow {
                work_date: parse_date(&work_date).map_err(conv_err)?,
                project,
                person,
                bank,
                hours: Hours::from_centihours(centihours),
                note,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Every allocatable bank of every active client, with the settings the
    /// depletion re-scan needs to evaluate the standing signal.
    pub fn depletion_scan_rows(&self) -> Result<Vec<DepletionScanRow>, StoreError> {
        let conn = self.lock()?;
        let bank_columns = BANK_COLUMNS
            .split(',')
            .map(|col| format!("timebanks.{}", col.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {bank_columns}, c.name AS client_name, c.contact_email, \
                    c.warn_threshold_pct
             FROM timebanks
             JOIN clients c ON c.id = timebanks.client_id
             WHERE timebanks.status != 'closed' AND c.active = 1
             ORDER BY timebanks.client_id, timebanks.purchased_at, timebanks.id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let bank = bank_from_row(row)?;
            let client_name: String = row.get("client_name")?;
            let contact_email: String = row.get("contact_email")?;
            let warn_threshold_pct: i64 = row.get("warn_threshold_pct")?;
            Ok(DepletionScanRow {
                bank,
                client_name,
                contact_email: EmailAddress::parse(&contact_email).map_err(conv_err)?,
                warn_threshold_pct: u8::try_from(warn_threshold_pct).map_err(conv_err)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Entries drawn against one bank, oldest first. Used by exports and the
    /// bank detail view.
    pub fn entries_for_bank(
        &self,
        bank: &TimebankId,
        limit: u32,
    ) -> Result<Vec<TimeEntry>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM time_entries
             WHERE timebank_id = ?1 ORDER BY logged_at, id LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params![bank.to_string(), i64::from(limit)],
            entry_from_row,
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
