use crate::store::{conv_err, flag, is_set, parse_ts, ts_text};
use crate::{Store, StoreError, StoreErrorCode};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use timebank_model::{
    check_role_scope, ClientId, EmailAddress, PersonName, Role, User, UserId,
};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: EmailAddress,
    pub name: PersonName,
    pub role: Role,
    pub client_id: Option<ClientId>,
    pub password_hash: String,
}

/// Partial update; `client_id` distinguishes "leave alone" from "clear".
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<PersonName>,
    pub role: Option<Role>,
    pub client_id: Option<Option<ClientId>>,
    pub active: Option<bool>,
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get("id")?;
    let email: String = row.get("email")?;
    let name: String = row.get("name")?;
    let role: String = row.get("role")?;
    let client_id: Option<String> = row.get("client_id")?;
    let active: i64 = row.get("active")?;
    let created_at: String = row.get("created_at")?;
    Ok(User {
        id: UserId::parse(&id).map_err(conv_err)?,
        email: EmailAddress::parse(&email).map_err(conv_err)?,
        name: PersonName::parse(&name).map_err(conv_err)?,
        role: Role::parse(&role).map_err(conv_err)?,
        client_id: client_id
            .map(|c| ClientId::parse(&c).map_err(conv_err))
            .transpose()?,
        active: is_set(active),
        created_at: parse_ts(&created_at).map_err(conv_err)?,
    })
}

const USER_COLUMNS: &str = "id, email, name, role, client_id, active, created_at";

impl Store {
    pub fn create_user(&self, new: &NewUser, now: DateTime<Utc>) -> Result<User, StoreError> {
        check_role_scope(new.role, new.client_id.as_ref())
            .map_err(|e| StoreError::validation(e.0))?;
        let user = User {
            id: UserId::new(),
            email: new.email.clone(),
            name: new.name.clone(),
            role: new.role,
            client_id: new.client_id,
            active: true,
            created_at: now,
        };
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (id, email, name, role, client_id, password_hash, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
            params![
                user.id.to_string(),
                user.email.as_str(),
                user.name.as_str(),
                user.role.as_str(),
                user.client_id.map(|c| c.to_string()),
                new.password_hash,
                ts_text(now),
            ],
        )?;
        if inserted == 0 {
            return Err(StoreError::conflict(format!(
                "a user with email {} already exists",
                user.email
            )));
        }
        Ok(user)
    }

    pub fn get_user(&self, id: &UserId) -> Result<User, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(user_from_row(row)?),
            None => Err(StoreError::not_found(format!("user {id} not found"))),
        }
    }

    pub fn find_user_by_email(&self, email: &EmailAddress) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([email.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(user_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn user_password_hash(&self, id: &UserId) -> Result<String, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT password_hash FROM users WHERE id = ?1")?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(row.get(0)?),
            None => Err(StoreError::not_found(format!("user {id} not found"))),
        }
    }

    pub fn set_user_password(&self, id: &UserId, password_hash: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![password_hash, id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found(format!("user {id} not found")));
        }
        Ok(())
    }

    pub fn list_users(
        &self,
        client: Option<&ClientId>,
        include_inactive: bool,
        limit: u32,
    ) -> Result<Vec<User>, StoreError> {
        let conn = self.lock()?;
        let mut sql = format!("SELECT {USER_COLUMNS} FROM users");
        let mut clauses: Vec<String> = Vec::new();
        let mut params_vec: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(client_id) = client {
            clauses.push("client_id = ?".to_string());
            params_vec.push(client_id.to_string().into());
        }
        if !include_inactive {
            clauses.push("active = 1".to_string());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY name, id LIMIT ?");
        params_vec.push(i64::from(limit).into());

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params_vec), user_from_row)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    pub fn update_user(&self, id: &UserId, patch: &UserPatch) -> Result<User, StoreError> {
        let current = self.get_user(id)?;
        let next_role = patch.role.unwrap_or(current.role);
        let next_client = match &patch.client_id {
            Some(explicit) => *explicit,
            None => current.client_id,
        };
        let next_active = patch.active.unwrap_or(current.active);
        check_role_scope(next_role, next_client.as_ref())
            .map_err(|e| StoreError::validation(e.0))?;

        let losing_admin =
            current.role == Role::Admin && current.active && (next_role != Role::Admin || !next_active);
        if losing_admin && self.count_active_admins_excluding(id)? == 0 {
            return Err(StoreError::conflict(
                "cannot remove the last active admin",
            ));
        }

        let conn = self.lock()?;
        conn.execute(
            "UPDATE users SET name = ?1, role = ?2, client_id = ?3, active = ?4 WHERE id = ?5",
            params![
                patch.name.as_ref().unwrap_or(&current.name).as_str(),
                next_role.as_str(),
                next_client.map(|c| c.to_string()),
                flag(next_active),
                id.to_string(),
            ],
        )?;
        if !next_active {
            conn.execute(
                "DELETE FROM sessions WHERE user_id = ?1",
                [id.to_string()],
            )?;
        }
        drop(conn);
        self.get_user(id)
    }

    pub fn deactivate_user(&self, id: &UserId) -> Result<(), StoreError> {
        let patch = UserPatch {
            active: Some(false),
            ..UserPatch::default()
        };
        self.update_user(id, &patch).map(|_| ())
    }

    pub fn count_active_admins(&self) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = 'admin' AND active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn count_active_admins_excluding(&self, id: &UserId) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = 'admin' AND active = 1 AND id != ?1",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}
