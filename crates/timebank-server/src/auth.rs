// SPDX-License-Identifier: Apache-2.0

//! Bearer-session authentication and role scoping. Tokens are opaque
//! 32-byte values; only their SHA-256 lives in the store, and resolving one
//! slides the session expiry forward.

use crate::failure::ApiFailure;
use crate::AppState;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use timebank_api::ApiError;
use timebank_core::token::token_hash;
use timebank_model::{ClientId, Role, User};

/// Authenticated caller plus the (slid) session expiry.
#[derive(Debug, Clone)]
pub(crate) struct AuthContext {
    pub user: User,
    pub session_expires_at: DateTime<Utc>,
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

pub(crate) fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthContext, ApiFailure> {
    let token = bearer_token(headers).ok_or_else(ApiError::unauthorized)?;
    let now = Utc::now();
    let ttl = state.config.session_ttl();
    let user = state
        .store
        .resolve_session(&token_hash(&token), ttl, now)?
        .ok_or_else(ApiError::unauthorized)?;
    Ok(AuthContext {
        user,
        session_expires_at: now + ttl,
    })
}

fn role_rank(role: Role) -> u8 {
    match role {
        Role::Admin => 3,
        Role::Manager => 2,
        Role::Member => 1,
    }
}

pub(crate) fn require_admin(user: &User) -> Result<(), ApiFailure> {
    if user.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::forbidden("requires admin role").into())
    }
}

/// Admins pass unconditionally; managers and members must be scoped to the
/// client and carry at least `min_role`.
pub(crate) fn require_client_role(
    user: &User,
    client: &ClientId,
    min_role: Role,
) -> Result<(), ApiFailure> {
    if user.role == Role::Admin {
        return Ok(());
    }
    if user.client_id.as_ref() != Some(client) {
        return Err(ApiError::forbidden("outside your client scope").into());
    }
    if role_rank(user.role) < role_rank(min_role) {
        return Err(ApiError::forbidden("insufficient role").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;
    use timebank_model::{EmailAddress, PersonName, UserId};

    fn user(role: Role, client_id: Option<ClientId>) -> User {
        User {
            id: UserId::new(),
            email: EmailAddress::parse("member@acme.example").expect("email"),
            name: PersonName::parse("Member").expect("name"),
            role,
            client_id,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn bearer_extraction_trims_and_rejects_empty() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer  abc "));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_none());
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn scope_checks_gate_by_client_and_rank() {
        let client = ClientId::new();
        let other = ClientId::new();
        let manager = user(Role::Manager, Some(client));
        let member = user(Role::Member, Some(client));
        let admin = user(Role::Admin, None);

        assert!(require_client_role(&admin, &other, Role::Manager).is_ok());
        assert!(require_client_role(&manager, &client, Role::Manager).is_ok());
        assert!(require_client_role(&manager, &other, Role::Member).is_err());
        assert!(require_client_role(&member, &client, Role::Manager).is_err());
        assert!(require_client_role(&member, &client, Role::Member).is_ok());
    }
}
