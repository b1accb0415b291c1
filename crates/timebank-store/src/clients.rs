use crate::store::{conv_err, flag, is_set, parse_ts, ts_text};
use crate::{Store, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use timebank_model::{
    parse_warn_threshold_pct, Client, ClientId, ClientName, EmailAddress, Project, ProjectId,
    ProjectName,
};

#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: ClientName,
    pub contact_email: EmailAddress,
    pub warn_threshold_pct: u8,
    pub notify_on_entry: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClientPatch {
    pub name: Option<ClientName>,
    pub contact_email: Option<EmailAddress>,
    pub warn_threshold_pct: Option<u8>,
    pub notify_on_entry: Option<bool>,
    pub active: Option<bool>,
}

pub(crate) fn client_from_row(row: &Row<'_>) -> rusqlite::Result<Client> {
    let id: String = row.get("id")?;
    let name: String = row.get("name")?;
    let contact_email: String = row.get("contact_email")?;
    let warn_threshold_pct: i64 = row.get("warn_threshold_pct")?;
    let notify_on_entry: i64 = row.get("notify_on_entry")?;
    let active: i64 = row.get("active")?;
    let created_at: String = row.get("created_at")?;
    Ok(Client {
        id: ClientId::parse(&id).map_err(conv_err)?,
        name: ClientName::parse(&name).map_err(conv_err)?,
        contact_email: EmailAddress::parse(&contact_email).map_err(conv_err)?,
        warn_threshold_pct: u8::try_from(warn_threshold_pct).map_err(conv_err)?,
        notify_on_entry: is_set(notify_on_entry),
        active: is_set(active),
        created_at: parse_ts(&created_at).map_err(conv_err)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    let id: String = row.get("id")?;
    let client_id: String = row.get("client_id")?;
    let name: String = row.get("name")?;
    let active: i64 = row.get("active")?;
    let created_at: String = row.get("created_at")?;
    Ok(Project {
        id: ProjectId::parse(&id).map_err(conv_err)?,
        client_id: ClientId::parse(&client_id).map_err(conv_err)?,
        name: ProjectName::parse(&name).map_err(conv_err)?,
        active: is_set(active),
        created_at: parse_ts(&created_at).map_err(conv_err)?,
    })
}

const CLIENT_COLUMNS: &str =
    "id, name, contact_email, warn_threshold_pct, notify_on_entry, active, created_at";
const PROJECT_COLUMNS: &str = "id, client_id, name, active, created_at";

impl Store {
    pub fn create_client(&self, new: &NewClient, now: DateTime<Utc>) -> Result<Client, StoreError> {
        let pct = parse_warn_threshold_pct(new.warn_threshold_pct)
            .map_err(|e| StoreError::validation(e.0))?;
        let client = Client {
            id: ClientId::new(),
            name: new.name.clone(),
            contact_email: new.contact_email.clone(),
            warn_threshold_pct: pct,
            notify_on_entry: new.notify_on_entry,
            active: true,
            created_at: now,
        };
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO clients (id, name, contact_email, warn_threshold_pct, notify_on_entry, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            params![
                client.id.to_string(),
                client.name.as_str(),
                client.contact_email.as_str(),
                i64::from(pct),
                flag(client.notify_on_entry),
                ts_text(now),
            ],
        )?;
        Ok(client)
    }

    pub fn get_client(&self, id: &ClientId) -> Result<Client, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(client_from_row(row)?),
            None => Err(StoreError::not_found(format!("client {id} not found"))),
        }
    }

    pub fn list_clients(&self, include_inactive: bool, limit: u32) -> Result<Vec<Client>, StoreError> {
        let conn = self.lock()?;
        let sql = if include_inactive {
            format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY name, id LIMIT ?1")
        } else {
            format!(
                "SELECT {CLIENT_COLUMNS} FROM clients WHERE active = 1 ORDER BY name, id LIMIT ?1"
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([i64::from(limit)], client_from_row)?;
        let mut clients = Vec::new();
        for row in rows {
            clients.push(row?);
        }
        Ok(clients)
    }

    pub fn update_client(&self, id: &ClientId, patch: &ClientPatch) -> Result<Client, StoreError> {
        let current = self.get_client(id)?;
        let pct = match patch.warn_threshold_pct {
            Some(p) => parse_warn_threshold_pct(p).map_err(|e| StoreError::validation(e.0))?,
            None => current.warn_threshold_pct,
        };
        let conn = self.lock()?;
        conn.execute(
            "UPDATE clients
             SET name = ?1, contact_email = ?2, warn_threshold_pct = ?3, notify_on_entry = ?4, active = ?5
             WHERE id = ?6",
            params![
                patch.name.as_ref().unwrap_or(&current.name).as_str(),
                patch
                    .contact_email
                    .as_ref()
                    .unwrap_or(&current.contact_email)
                    .as_str(),
                i64::from(pct),
                flag(patch.notify_on_entry.unwrap_or(current.notify_on_entry)),
                flag(patch.active.unwrap_or(current.active)),
                id.to_string(),
            ],
        )?;
        drop(conn);
        self.get_client(id)
    }

    /// Soft delete. History under the client stays queryable.
    pub fn deactivate_client(&self, id: &ClientId) -> Result<(), StoreError> {
        let patch = ClientPatch {
            active: Some(false),
            ..ClientPatch::default()
        };
        self.update_client(id, &patch).map(|_| ())
    }

    pub fn create_project(
        &self,
        client_id: &ClientId,
        name: &ProjectName,
        now: DateTime<Utc>,
    ) -> Result<Project, StoreError> {
        // Reject new projects under a deactivated client.
        let client = self.get_client(client_id)?;
        if !client.active {
            return Err(StoreError::validation(format!(
                "client {client_id} is inactive"
            )));
        }
        let project = Project {
            id: ProjectId::new(),
            client_id: *client_id,
            name: name.clone(),
            active: true,
            created_at: now,
        };
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO projects (id, client_id, name, active, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![
                project.id.to_string(),
                client_id.to_string(),
                name.as_str(),
                ts_text(now),
            ],
        )?;
        Ok(project)
    }

    pub fn get_project(&self, id: &ProjectId) -> Result<Project, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(project_from_row(row)?),
            None => Err(StoreError::not_found(format!("project {id} not found"))),
        }
    }

    pub fn list_projects(
        &self,
        client: Option<&ClientId>,
        include_inactive: bool,
        limit: u32,
    ) -> Result<Vec<Project>, StoreError> {
        let conn = self.lock()?;
        let mut sql = format!("SELECT {PROJECT_COLUMNS} FROM projects");
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
        let rows = stmt.query_map(rusqlite::params_from_iter(params_vec), project_from_row)?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?);
        }
        Ok(projects)
    }

    pub fn update_project(
        &self,
        id: &ProjectId,
        name: Option<&ProjectName>,
        active: Option<bool>,
    ) -> Result<Project, StoreError> {
        let current = self.get_project(id)?;
        let conn = self.lock()?;
        conn.execute(
            "UPDATE projects SET name = ?1, active = ?2 WHERE id = ?3",
            params![
                name.unwrap_or(&current.name).as_str(),
                flag(active.unwrap_or(current.active)),
                id.to_string(),
            ],
        )?;
        drop(conn);
        self.get_project(id)
    }

    pub fn deactivate_project(&self, id: &ProjectId) -> Result<(), StoreError> {
        self.update_project(id, None, Some(false)).map(|_| ())
    }
}
