// SPDX-License-Identifier: Apache-2.0

use crate::store::{conv_err, date_text, parse_date, parse_ts, ts_text};
use crate::{Store, StoreError};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use timebank_ledger::BankSnapshot;
use timebank_model::{ClientId, Hours, Timebank, TimebankId, TimebankName, TimebankStatus};

#[derive(Debug, Clone)]
pub struct NewTimebank {
    pub client_id: ClientId,
    pub name: TimebankName,
    pub purchased_hours: Hours,
    pub purchased_at: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct TimebankPatch {
    pub name: Option<TimebankName>,
    /// Adjusting the purchased pool credits or debits `remaining` by the
    /// same amount; `used` is untouched so the balance invariant holds.
    pub purchased_hours: Option<Hours>,
}

pub(crate) fn bank_from_row(row: &Row<'_>) -> rusqlite::Result<Timebank> {
    let id: String = row.get("id")?;
    let client_id: String = row.get("client_id")?;
    let name: String = row.get("name")?;
    let purchased: i64 = row.get("purchased_centi")?;
    let used: i64 = row.get("used_centi")?;
    let remaining: i64 = row.get("remaining_centi")?;
    let status: String = row.get("status")?;
    let purchased_at: String = row.get("purchased_at")?;
    let created_at: String = row.get("created_at")?;
    Ok(Timebank {
        id: TimebankId::parse(&id).map_err(conv_err)?,
        client_id: ClientId::parse(&client_id).map_err(conv_err)?,
        name: TimebankName::parse(&name).map_err(conv_err)?,
        purchased_hours: Hours::from_centihours(purchased),
        used_hours: Hours::from_centihours(used),
        remaining_hours: Hours::from_centihours(remaining),
        status: TimebankStatus::parse(&status).map_err(conv_err)?,
        purchased_at: parse_date(&purchased_at).map_err(conv_err)?,
        created_at: parse_ts(&created_at).map_err(conv_err)?,
    })
}

pub(crate) const BANK_COLUMNS: &str = "id, client_id, name, purchased_centi, used_centi, \
     remaining_centi, status, purchased_at, created_at";

pub(crate) fn get_bank_tx(conn: &Connection, id: &TimebankId) -> Result<Timebank, StoreError> {
    let sql = format!("SELECT {BANK_COLUMNS} FROM timebanks WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(bank_from_row(row)?),
        None => Err(StoreError::not_found(format!("timebank {id} not found"))),
    }
}

impl Store {
    pub fn create_timebank(
        &self,
        new: &NewTimebank,
        now: DateTime<Utc>,
    ) -> Result<Timebank, StoreError> {
        if !new.purchased_hours.is_positive() {
            return Err(StoreError::validation(format!(
                "purchased hours must be positive, got {}",
                new.purchased_hours
            )));
        }
        let client = self.get_client(&new.client_id)?;
        if !client.active {
            return Err(StoreError::validation(format!(
                "client {} is inactive",
                new.client_id
            )));
        }
        let bank = Timebank {
            id: TimebankId::new(),
            client_id: new.client_id,
            name: new.name.clone(),
            purchased_hours: new.purchased_hours,
            used_hours: Hours::ZERO,
            remaining_hours: new.purchased_hours,
            status: TimebankStatus::Active,
            purchased_at: new.purchased_at,
            created_at: now,
        };
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO timebanks (id, client_id, name, purchased_centi, used_centi, \
             remaining_centi, status, purchased_at, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?4, 'active', ?5, ?6)",
            params![
                bank.id.to_string(),
                bank.client_id.to_string(),
                bank.name.as_str(),
                bank.purchased_hours.centihours(),
                date_text(bank.purchased_at),
                ts_text(now),
            ],
        )?;
        Ok(bank)
    }

    pub fn get_timebank(&self, id: &TimebankId) -> Result<Timebank, StoreError> {
        let conn = self.lock()?;
        get_bank_tx(&conn, id)
    }

    pub fn list_timebanks(
        &self,
        client: Option<&ClientId>,
        status: Option<TimebankStatus>,
        limit: u32,
    ) -> Result<Vec<Timebank>, StoreError> {
        let conn = self.lock()?;
        let mut sql = format!("SELECT {BANK_COLUMNS} FROM timebanks");
        let mut clauses: Vec<String> = Vec::new();
        let mut params_vec: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(client_id) = client {
            clauses.push("client_id = ?".to_string());
            params_vec.push(client_id.to_string().into());
        }
        if let Some(status) = status {
            clauses.push("status = ?".to_string());
            params_vec.push(status.as_str().to_string().into());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY purchased_at, id LIMIT ?");
        params_vec.push(i64::from(limit).into());

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params_vec), bank_from_row)?;
        let mut banks = Vec::new();
        for row in rows {
            banks.push(row?);
        }
        Ok(banks)
    }

    /// Balance views of the client's allocatable banks, in allocation order.
    pub fn bank_snapshots(&self, client: &ClientId) -> Result<Vec<BankSnapshot>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, remaining_centi, purchased_at FROM timebanks
             WHERE client_id = ?1 AND status != 'closed'
             ORDER BY remaining_centi, purchased_at, id",
        )?;
        let rows = stmt.query_map([client.to_string()], |row| {
            let id: String = row.get(0)?;
            let remaining: i64 = row.get(1)?;
            let purchased_at: String = row.get(2)?;
            Ok(BankSnapshot {
                id: TimebankId::parse(&id).map_err(conv_err)?,
                remaining: Hours::from_centihours(remaining),
                purchased_at: parse_date(&purchased_at).map_err(conv_err)?,
            })
        })?;
        let mut snapshots = Vec::new();
        for row in rows {
            snapshots.push(row?);
        }
        Ok(snapshots)
    }

    pub fn update_timebank(
        &self,
        id: &TimebankId,
        patch: &TimebankPatch,
    ) -> Result<Timebank, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let current = get_bank_tx(&tx, id)?;
        if current.status == TimebankStatus::Closed {
            return Err(StoreError::validation(format!(
                "timebank {id} is closed"
            )));
        }
        let next_purchased = patch.purchased_hours.unwrap_or(current.purchased_hours);
        if !next_purchased.is_positive() {
            return Err(StoreError::validation(
                "purchased hours must stay positive",
            ));
        }
        let next_remaining = next_purchased - current.used_hours;
        let next_status = timebank_ledger::next_status(current.status, next_remaining);
        tx.execute(
            "UPDATE timebanks
             SET name = ?1, purchased_centi = ?2, remaining_centi = ?3, status = ?4
             WHERE id = ?5",
            params![
                patch.name.as_ref().unwrap_or(&current.name).as_str(),
                next_purchased.centihours(),
                next_remaining.centihours(),
                next_status.as_str(),
                id.to_string(),
            ],
        )?;
        let updated = get_bank_tx(&tx, id)?;
        tx.commit()?;
        Ok(updated)
    }

    /// Terminal soft delete: the bank keeps its history but never
    /// participates in allocation again.
    pub fn close_timebank(&self, id: &TimebankId) -> Result<Timebank, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE timebanks SET status = 'closed' WHERE id = ?1",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found(format!("timebank {id} not found")));
        }
        get_bank_tx(&conn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewClient, StoreErrorCode};
    use timebank_model::{ClientName, EmailAddress, DEFAULT_WARN_THRESHOLD_PCT};

    fn store_with_client() -> (Store, ClientId) {
        let store = Store::open_in_memory().expect("store");
        let client = store
            .create_client(
                &NewClient {
                    name: ClientName::parse("Acme").expect("name"),
                    contact_email: EmailAddress::parse("ops@acme.example").expect("email"),
                    warn_threshold_pct: DEFAULT_WARN_THRESHOLD_PCT,
                    notify_on_entry: false,
                },
                Utc::now(),
            )
            .expect("client");
        (store, client.id)
    }

    fn add_bank(store: &Store, client: &ClientId, name: &str, hours: &str) -> Timebank {
        store
            .create_timebank(
                &NewTimebank {
                    client_id: *client,
                    name: TimebankName::parse(name).expect("name"),
                    purchased_hours: Hours::parse(hours).expect("hours"),
                    purchased_at: NaiveDate::from_ymd_opt(2026, 1, 15).expect("date"),
                },
                Utc::now(),
            )
            .expect("bank")
    }

    #[test]
    fn new_bank_starts_full_and_active() {
        let (store, client) = store_with_client();
        let bank = add_bank(&store, &client, "Q1 retainer", "40.00");
        assert_eq!(bank.remaining_hours, bank.purchased_hours);
        assert_eq!(bank.status, TimebankStatus::Active);
        assert!(bank.balanced());
        assert_eq!(store.get_timebank(&bank.id).expect("get"), bank);
    }

    #[test]
    fn rejects_non_positive_purchase() {
        let (store, client) = store_with_client();
        let err = store
            .create_timebank(
                &NewTimebank {
                    client_id: client,
                    name: TimebankName::parse("Empty").expect("name"),
                    purchased_hours: Hours::ZERO,
                    purchased_at: NaiveDate::from_ymd_opt(2026, 1, 15).expect("date"),
                },
                Utc::now(),
            )
            .expect_err("zero purchase");
        assert_eq!(err.code, StoreErrorCode::Validation);
    }

    #[test]
    fn purchase_adjustment_moves_remaining_and_status() {
        let (store, client) = store_with_client();
        let bank = add_bank(&store, &client, "Retainer", "10.00");
        let grown = store
            .update_timebank(
                &bank.id,
                &TimebankPatch {
                    purchased_hours: Some(Hours::parse("25.00").expect("hours")),
                    ..TimebankPatch::default()
                },
            )
            .expect("grow");
        assert_eq!(grown.remaining_hours.to_string(), "25.00");
        assert!(grown.balanced());
    }

    #[test]
    fn closed_banks_leave_the_snapshot_set() {
        let (store, client) = store_with_client();
        let keep = add_bank(&store, &client, "Keep", "5.00");
        let close = add_bank(&store, &client, "Close", "9.00");
        store.close_timebank(&close.id).expect("close");

        let snapshots = store.bank_snapshots(&client).expect("snapshots");
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].id, keep.id);

        let err = store
            .update_timebank(&close.id, &TimebankPatch::default())
            .expect_err("closed bank is immutable");
        assert_eq!(err.code, StoreErrorCode::Validation);
    }

    #[test]
    fn snapshots_order_by_remaining_then_purchase_date() {
        let (store, client) = store_with_client();
        let big = add_bank(&store, &client, "Big", "40.00");
        let small = add_bank(&store, &client, "Small", "3.00");
        let snapshots = store.bank_snapshots(&client).expect("snapshots");
        assert_eq!(
            snapshots.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![small.id, big.id]
        );
    }
}
