// SPDX-License-Identifier: Apache-2.0

pub(crate) mod auth;
pub(crate) mod banks;
pub(crate) mod clients;
pub(crate) mod entries;
pub(crate) mod invites;
pub(crate) mod notifications;
pub(crate) mod projects;
pub(crate) mod system;
pub(crate) mod users;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::AppState;
    use axum::http::{HeaderMap, HeaderValue};
    use chrono::Utc;
    use timebank_core::password::hash_password;
    use timebank_core::token::{generate_token, token_hash};
    use timebank_model::{
        Client, ClientId, ClientName, EmailAddress, PersonName, Role, User,
    };
    use timebank_store::{NewClient, NewUser};

    pub(crate) fn seed_user(
        state: &AppState,
        email: &str,
        role: Role,
        client_id: Option<ClientId>,
    ) -> User {
        state
            .store
            .create_user(
                &NewUser {
                    email: EmailAddress::parse(email).expect("email"),
                    name: PersonName::parse("Test Person").expect("name"),
                    role,
                    client_id,
                    password_hash: hash_password("hunter22", 1_000).expect("hash"),
                },
                Utc::now(),
            )
            .expect("seed user")
    }

    pub(crate) fn seed_client(state: &AppState, name: &str) -> Client {
        state
            .store
            .create_client(
                &NewClient {
                    name: ClientName::parse(name).expect("name"),
                    contact_email: EmailAddress::parse("ops@client.example").expect("email"),
                    warn_threshold_pct: 20,
                    notify_on_entry: false,
                },
                Utc::now(),
            )
            .expect("seed client")
    }

    /// Creates a session for the user and returns headers carrying it.
    pub(crate) fn session_headers(state: &AppState, user: &User) -> HeaderMap {
        let token = generate_token();
        state
            .store
            .create_session(
                &user.id,
                &token_hash(&token),
                state.config.session_ttl(),
                Utc::now(),
            )
            .expect("session");
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
        );
        headers
    }
}
