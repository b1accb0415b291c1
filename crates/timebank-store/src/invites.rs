use crate::store::{conv_err, parse_ts, ts_text};
use crate::{Store, StoreError, StoreErrorCode};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use timebank_model::{
    check_role_scope, ClientId, EmailAddress, Invitation, InviteId, InviteStatus, PersonName,
    Role, User, UserId,
};

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub email: EmailAddress,
    pub role: Role,
    pub client_id: Option<ClientId>,
    /// SHA-256 of the one-time token; the cleartext is never stored.
    pub token_hash: String,
    pub invited_by: UserId,
    pub expires_at: DateTime<Utc>,
}

fn invite_from_row(row: &Row<'_>) -> rusqlite::Result<Invitation> {
    let id: String = row.get("id")?;
    let email: String = row.get("email")?;
    let role: String = row.get("role")?;
    let client_id: Option<String> = row.get("client_id")?;
    let status: String = row.get("status")?;
    let token_hash: String = row.get("token_hash")?;
    let invited_by: String = row.get("invited_by")?;
    let created_at: String = row.get("created_at")?;
    let expires_at: String = row.get("expires_at")?;
    Ok(Invitation {
        id: InviteId::parse(&id).map_err(conv_err)?,
        email: EmailAddress::parse(&email).map_err(conv_err)?,
        role: Role::parse(&role).map_err(conv_err)?,
        client_id: client_id
            .map(|c| ClientId::parse(&c).map_err(conv_err))
            .transpose()?,
        status: InviteStatus::parse(&status).map_err(conv_err)?,
        token_hash,
        invited_by: UserId::parse(&invited_by).map_err(conv_err)?,
        created_at: parse_ts(&created_at).map_err(conv_err)?,
        expires_at: parse_ts(&expires_at).map_err(conv_err)?,
    })
}

const INVITE_COLUMNS: &str =
    "id, email, role, client_id, status, token_hash, invited_by, created_at, expires_at";

impl Store {
    pub fn create_invitation(
        &self,
        new: &NewInvitation,
        now: DateTime<Utc>,
    ) -> Result<Invitation, StoreError> {
        check_role_scope(new.role, new.client_id.as_ref())
            .map_err(|e| StoreError::validation(e.0))?;
        if new.expires_at <= now {
            return Err(StoreError::validation(
                "invitation expiry must be in the future",
            ));
        }
        if self.find_user_by_email(&new.email)?.is_some() {
            return Err(StoreError::conflict(format!(
                "a user with email {} already exists",
                new.email
            )));
        }
        let invite = Invitation {
            id: InviteId::new(),
            email: new.email.clone(),
            role: new.role,
            client_id: new.client_id,
            status: InviteStatus::Pending,
            token_hash: new.token_hash.clone(),
            invited_by: new.invited_by,
            created_at: now,
            expires_at: new.expires_at,
        };
        let conn = self.lock()?;
        let pending: i64 = conn.query_row(
            "SELECT COUNT(*) FROM invitations WHERE email = ?1 AND status = 'pending'",
            [invite.email.as_str()],
            |row| row.get(0),
        )?;
        if pending > 0 {
            return Err(StoreError::conflict(format!(
                "a pending invitation for {} already exists",
                invite.email
            )));
        }
        conn.execute(
            "INSERT INTO invitations (id, email, role, client_id, status, token_hash, \
             invited_by, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?7, ?8)",
            params![
                invite.id.to_string(),
                invite.email.as_str(),
                invite.role.as_str(),
                invite.client_id.map(|c| c.to_string()),
                invite.token_hash,
                invite.invited_by.to_string(),
                ts_text(now),
                ts_text(invite.expires_at),
            ],
        )?;
        Ok(invite)
    }

    pub fn get_invitation(&self, id: &InviteId) -> Result<Invitation, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {INVITE_COLUMNS} FROM invitations WHERE id = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(invite_from_row(row)?),
            None => Err(StoreError::not_found(format!("invitation {id} not found"))),
        }
    }

    pub fn list_invitations(
        &self,
        client: Option<&ClientId>,
        status: Option<InviteStatus>,
        limit: u32,
    ) -> Result<Vec<Invitation>, StoreError> {
        let conn = self.lock()?;
        let mut sql = format!("SELECT {INVITE_COLUMNS} FROM invitations");
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
        sql.push_str(" ORDER BY created_at DESC, id LIMIT ?");
        params_vec.push(i64::from(limit).into());

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params_vec), invite_from_row)?;
        let mut invites = Vec::new();
        for row in rows {
            invites.push(row?);
        }
        Ok(invites)
    }

    /// Redeems a pending invitation: creates the user and marks the invite
    /// accepted in one transaction. Fails with `not_found` for unknown
    /// tokens and `validation` for expired or already-used ones.
    pub fn accept_invitation(
        &self,
        token_hash: &str,
        name: &PersonName,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(Invitation, User), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let invite = {
            let sql = format!("SELECT {INVITE_COLUMNS} FROM invitations WHERE token_hash = ?1");
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query([token_hash])?;
            match rows.next()? {
                Some(row) => invite_from_row(row)?,
                None => return Err(StoreError::not_found("invitation token not recognized")),
            }
        };
        if invite.status != InviteStatus::Pending {
            return Err(StoreError::validation(format!(
                "invitation is {}",
                invite.status
            )));
        }
        if invite.expires_at <= now {
            tx.execute(
                "UPDATE invitations SET status = 'expired' WHERE id = ?1",
                [invite.id.to_string()],
            )?;
            tx.commit()?;
            return Err(StoreError::validation("invitation has expired"));
        }

        let user = User {
            id: UserId::new(),
            email: invite.email.clone(),
            name: name.clone(),
            role: invite.role,
            client_id: invite.client_id,
            active: true,
            created_at: now,
        };
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO users (id, email, name, role, client_id, password_hash, \
             active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
            params![
                user.id.to_string(),
                user.email.as_str(),
                user.name.as_str(),
                user.role.as_str(),
                user.client_id.map(|c| c.to_string()),
                password_hash,
                ts_text(now),
            ],
        )?;
        if inserted == 0 {
            return Err(StoreError::conflict(format!(
                "a user with email {} already exists",
                user.email
            )));
        }
        tx.execute(
            "UPDATE invitations SET status = 'accepted' WHERE id = ?1",
            [invite.id.to_string()],
        )?;
        tx.commit()?;
        let accepted = Invitation {
            status: InviteStatus::Accepted,
            ..invite
        };
        Ok((accepted, user))
    }

    pub fn revoke_invitation(&self, id: &InviteId) -> Result<Invitation, StoreError> {
        let invite = self.get_invitation(id)?;
        if invite.status != InviteStatus::Pending {
            return Err(StoreError::new(
                StoreErrorCode::Conflict,
                format!("invitation is already {}", invite.status),
            ));
        }
        let conn = self.lock()?;
        conn.execute(
            "UPDATE invitations SET status = 'revoked' WHERE id = ?1",
            [id.to_string()],
        )?;
        drop(conn);
        self.get_invitation(id)
    }

    /// Flips pending invitations past their expiry to `expired`. Returns the
    /// number of rows moved; run from the background sweep.
    pub fn expire_stale_invitations(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE invitations SET status = 'expired'
             WHERE status = 'pending' AND expires_at <= ?1",
            [ts_text(now)],
        )?;
        Ok(changed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::NewUser;
    use chrono::Duration;
    use timebank_core::token::{generate_token, token_hash};
    use timebank_model::{ClientName, DEFAULT_WARN_THRESHOLD_PCT};

    struct Fixture {
        store: Store,
        admin: UserId,
        client: ClientId,
    }

    fn fixture() -> Fixture {
        let store = Store::open_in_memory().expect("store");
        let admin = store
            .create_user(
                &NewUser {
                    email: EmailAddress::parse("admin@example.com").expect("email"),
                    name: PersonName::parse("Admin").expect("name"),
                    role: Role::Admin,
                    client_id: None,
                    password_hash: "pbkdf2-sha256$1000$aa$bb".to_string(),
                },
                Utc::now(),
            )
            .expect("admin");
        let client = store
            .create_client(
                &crate::NewClient {
                    name: ClientName::parse("Acme").expect("name"),
                    contact_email: EmailAddress::parse("ops@acme.example").expect("email"),
                    warn_threshold_pct: DEFAULT_WARN_THRESHOLD_PCT,
                    notify_on_entry: false,
                },
                Utc::now(),
            )
            .expect("client");
        Fixture {
            store,
            admin: admin.id,
            client: client.id,
        }
    }

    fn invite(fx: &Fixture, email: &str, hash: &str, ttl_hours: i64) -> Invitation {
        fx.store
            .create_invitation(
                &NewInvitation {
                    email: EmailAddress::parse(email).expect("email"),
                    role: Role::Member,
                    client_id: Some(fx.client),
                    token_hash: hash.to_string(),
                    invited_by: fx.admin,
                    expires_at: Utc::now() + Duration::hours(ttl_hours),
                },
                Utc::now(),
            )
            .expect("invite")
    }

    #[test]
    fn accept_creates_the_user_and_consumes_the_invite() {
        let fx = fixture();
        let token = generate_token();
        invite(&fx, "pat@acme.example", &token_hash(&token), 72);

        let (accepted, user) = fx
            .store
            .accept_invitation(
                &token_hash(&token),
                &PersonName::parse("Pat Doe").expect("name"),
                "pbkdf2-sha256$1000$cc$dd",
                Utc::now(),
            )
            .expect("accept");
        assert_eq!(accepted.status, InviteStatus::Accepted);
        assert_eq!(user.role, Role::Member);
        assert_eq!(user.client_id, Some(fx.client));

        // Second redemption fails: the invite is spent.
        let err = fx
            .store
            .accept_invitation(
                &token_hash(&token),
                &PersonName::parse("Pat Doe").expect("name"),
                "pbkdf2-sha256$1000$cc$dd",
                Utc::now(),
            )
            .expect_err("spent");
        assert_eq!(err.code, StoreErrorCode::Validation);
    }

    #[test]
    fn expired_invitations_cannot_be_redeemed() {
        let fx = fixture();
        let token = generate_token();
        let created = invite(&fx, "late@acme.example", &token_hash(&token), 1);
        let err = fx
            .store
            .accept_invitation(
                &token_hash(&token),
                &PersonName::parse("Late Person").expect("name"),
                "pbkdf2-sha256$1000$cc$dd",
                Utc::now() + Duration::hours(2),
            )
            .expect_err("expired");
        assert_eq!(err.code, StoreErrorCode::Validation);
        assert_eq!(
            fx.store.get_invitation(&created.id).expect("get").status,
            InviteStatus::Expired
        );
    }

    #[test]
    fn duplicate_pending_invitations_conflict() {
        let fx = fixture();
        invite(&fx, "dup@acme.example", "hash-one", 72);
        let err = fx
            .store
            .create_invitation(
                &NewInvitation {
                    email: EmailAddress::parse("dup@acme.example").expect("email"),
                    role: Role::Member,
                    client_id: Some(fx.client),
                    token_hash: "hash-two".to_string(),
                    invited_by: fx.admin,
                    expires_at: Utc::now() + Duration::hours(72),
                },
                Utc::now(),
            )
            .expect_err("duplicate");
        assert_eq!(err.code, StoreErrorCode::Conflict);
    }

    #[test]
    fn revoke_only_applies_to_pending() {
        let fx = fixture();
        let created = invite(&fx, "rev@acme.example", "hash-rev", 72);
        let revoked = fx.store.revoke_invitation(&created.id).expect("revoke");
        assert_eq!(revoked.status, InviteStatus::Revoked);
        let err = fx.store.revoke_invitation(&created.id).expect_err("again");
        assert_eq!(err.code, StoreErrorCode::Conflict);
    }

    #[test]
    fn sweep_expires_stale_pending_invitations() {
        let fx = fixture();
        invite(&fx, "a@acme.example", "hash-a", 1);
        invite(&fx, "b@acme.example", "hash-b", 100);
        let moved = fx
            .store
            .expire_stale_invitations(Utc::now() + Duration::hours(2))
            .expect("sweep");
        assert_eq!(moved, 1);
        let pending = fx
            .store
            .list_invitations(None, Some(InviteStatus::Pending), 10)
            .expect("list");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].email.as_str(), "b@acme.example");
    }
}
