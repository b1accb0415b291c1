// SPDX-License-Identifier: Apache-2.0

use crate::auth::{authenticate, require_admin};
use crate::failure::ApiFailure;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use std::collections::BTreeMap;
use timebank_api::{
    parse_page_params, ApiError, CreateUserRequest, ListResponse, UpdateUserRequest,
};
use timebank_core::password::hash_password;
use timebank_model::{ClientId, EmailAddress, PersonName, Role, User, UserId};
use timebank_store::{NewUser, UserPatch};

fn parse_user_id(raw: &str) -> Result<UserId, ApiFailure> {
    UserId::parse(raw).map_err(|_| ApiError::invalid_param("id", "must be a uuid").into())
}

pub(crate) async fn list_users_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<ListResponse<User>>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let page = parse_page_params(&query)?;
    let scope = match ctx.user.role {
        Role::Admin => match query.get("client") {
            Some(raw) => Some(
                ClientId::parse(raw)
                    .map_err(|_| ApiError::invalid_param("client", "must be a uuid"))?,
            ),
            None => None,
        },
        Role::Manager => ctx.user.client_id,
        Role::Member => return Err(ApiError::forbidden("list users").into()),
    };
    let include_inactive = ctx.user.role == Role::Admin;
    let users = state
        .store
        .list_users(scope.as_ref(), include_inactive, page.limit)?;
    Ok(Json(ListResponse::without_cursor(users)))
}

pub(crate) async fn create_user_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx.user)?;

    let email = EmailAddress::parse(&body.email)
        .map_err(|e| ApiError::invalid_param("email", &e.0))?;
    let name = PersonName::parse(&body.name)
        .map_err(|e| ApiError::invalid_param("name", &e.0))?;
    let password_hash = hash_password(&body.password, state.config.password_iterations)
        .map_err(|e| ApiError::invalid_param("password", &e.0))?;
    let user = state.store.create_user(
        &NewUser {
            email,
            name,
            role: body.role,
            client_id: body.client_id,
            password_hash,
        },
        Utc::now(),
    )?;
    tracing::info!(user_id = %user.id, role = %user.role, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

pub(crate) async fn get_user_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let id = parse_user_id(&id)?;
    let user = state.store.get_user(&id)?;
    let allowed = ctx.user.role == Role::Admin
        || ctx.user.id == user.id
        || (ctx.user.role == Role::Manager
            && ctx.user.client_id.is_some()
            && ctx.user.client_id == user.client_id);
    if !allowed {
        return Err(ApiError::forbidden("read user").into());
    }
    Ok(Json(user))
}

pub(crate) async fn update_user_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let id = parse_user_id(&id)?;

    if ctx.user.role != Role::Admin {
        // Non-admins may only rename themselves or rotate their password.
        if ctx.user.id != id {
            return Err(ApiError::forbidden("update another user").into());
        }
        if body.role.is_some() || body.client_id.is_some() || body.active.is_some() {
            return Err(ApiError::forbidden("change role or scope").into());
        }
    }

    let name = match &body.name {
        Some(raw) => {
            Some(PersonName::parse(raw).map_err(|e| ApiError::invalid_param("name", &e.0))?)
        }
        None => None,
    };
    // Promoting to admin implicitly drops any client scope.
    let client_id = match (body.role, body.client_id) {
        (Some(Role::Admin), None) => Some(None),
        (_, Some(client)) => Some(Some(client)),
        (_, None) => None,
    };
    let user = state.store.update_user(
        &id,
        &UserPatch {
            name,
            role: body.role,
            client_id,
            active: body.active,
        },
    )?;
    if let Some(password) = &body.password {
        let password_hash = hash_password(password, state.config.password_iterations)
            .map_err(|e| ApiError::invalid_param("password", &e.0))?;
        state.store.set_user_password(&id, &password_hash)?;
    }
    Ok(Json(user))
}

pub(crate) async fn delete_user_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx.user)?;
    let id = parse_user_id(&id)?;
    state.store.deactivate_user(&id)?;
    tracing::info!(user_id = %id, "user deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{seed_client, seed_user, session_headers};
    use crate::AppState;

    #[tokio::test]
    async fn manager_sees_only_their_client_users() {
        let state = AppState::for_tests();
        let client = seed_client(&state, "Acme");
        let other = seed_client(&state, "Globex");
        let manager = seed_user(&state, "mgr@acme.example", Role::Manager, Some(client.id));
        seed_user(&state, "m1@acme.example", Role::Member, Some(client.id));
        seed_user(&state, "m2@globex.example", Role::Member, Some(other.id));

        let headers = session_headers(&state, &manager);
        let response = list_users_handler(State(state), headers, Query(BTreeMap::new()))
            .await
            .expect("list");
        let Json(page) = response;
        assert_eq!(page.items.len(), 2);
        assert!(page
            .items
            .iter()
            .all(|u| u.client_id == Some(client.id)));
    }

    #[tokio::test]
    async fn member_cannot_list_or_create_users() {
        let state = AppState::for_tests();
        let client = seed_client(&state, "Acme");
        let member = seed_user(&state, "m@acme.example", Role::Member, Some(client.id));
        let headers = session_headers(&state, &member);

        let err = list_users_handler(
            State(state.clone()),
            headers.clone(),
            Query(BTreeMap::new()),
        )
        .await
        .expect_err("member list");
        assert_eq!(err.0.code, timebank_api::ApiErrorCode::Forbidden);

        let err = create_user_handler(
            State(state),
            headers,
            Json(CreateUserRequest {
                email: "x@acme.example".to_string(),
                name: "X".to_string(),
                password: "pw-long-enough".to_string(),
                role: Role::Member,
                client_id: Some(client.id),
            }),
        )
        .await
        .expect_err("member create");
        assert_eq!(err.0.code, timebank_api::ApiErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn deactivating_the_last_admin_conflicts() {
        let state = AppState::for_tests();
        let admin = seed_user(&state, "root@ops.example", Role::Admin, None);
        let headers = session_headers(&state, &admin);

        let err = delete_user_handler(State(state), headers, Path(admin.id.to_string()))
            .await
            .expect_err("last admin");
        assert_eq!(err.0.code, timebank_api::ApiErrorCode::Conflict);
    }

    #[tokio::test]
    async fn member_can_rotate_own_password_but_not_role() {
        let state = AppState::for_tests();
        let client = seed_client(&state, "Acme");
        let member = seed_user(&state, "m@acme.example", Role::Member, Some(client.id));
        let headers = session_headers(&state, &member);

        let err = update_user_handler(
            State(state.clone()),
            headers.clone(),
            Path(member.id.to_string()),
            Json(UpdateUserRequest {
                role: Some(Role::Manager),
                ..UpdateUserRequest::default()
            }),
        )
        .await
        .expect_err("self promote");
        assert_eq!(err.0.code, timebank_api::ApiErrorCode::Forbidden);

        update_user_handler(
            State(state),
            headers,
            Path(member.id.to_string()),
            Json(UpdateUserRequest {
                name: Some("New Name".to_string()),
                password: Some("fresh-password".to_string()),
                ..UpdateUserRequest::default()
            }),
        )
        .await
        .expect("self update");
    }
}
