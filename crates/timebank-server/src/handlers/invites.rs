// SPDX-License-Identifier: Apache-2.0

//! Invitation lifecycle. The one-time token is returned exactly once at
//! creation; the store only ever sees its hash.

use crate::auth::{authenticate, require_client_role};
use crate::failure::ApiFailure;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use std::collections::BTreeMap;
use timebank_api::{
    parse_page_params, AcceptInviteRequest, ApiError, CreateInvitationRequest,
    InvitationCreatedResponse, ListResponse, TokenResponse,
};
use timebank_core::password::hash_password;
use timebank_core::token::{generate_token, token_hash};
use timebank_model::{EmailAddress, Invitation, InviteId, InviteStatus, PersonName, Role};
use timebank_notify::{invite_accepted_draft, invite_created_draft};
use timebank_store::NewInvitation;

fn parse_invite_id(raw: &str) -> Result<InviteId, ApiFailure> {
    InviteId::parse(raw).map_err(|_| ApiError::invalid_param("id", "must be a uuid").into())
}

pub(crate) async fn list_invitations_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<ListResponse<Invitation>>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let page = parse_page_params(&query)?;
    let scope = match ctx.user.role {
        Role::Admin => None,
        Role::Manager => Some(
            ctx.user
                .client_id
                .ok_or_else(|| ApiError::forbidden("no client scope"))?,
        ),
        Role::Member => return Err(ApiError::forbidden("list invitations").into()),
    };
    let status = match query.get("status") {
        Some(raw) => Some(
            InviteStatus::parse(raw)
                .map_err(|_| ApiError::invalid_param("status", "unknown invitation status"))?,
        ),
        None => None,
    };
    let invites = state
        .store
        .list_invitations(scope.as_ref(), status, page.limit)?;
    Ok(Json(ListResponse::without_cursor(invites)))
}

pub(crate) async fn create_invitation_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<InvitationCreatedResponse>), ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    match ctx.user.role {
        Role::Admin => {}
        // Managers may only grow their own client with members.
        Role::Manager => {
            if body.role != Role::Member {
                return Err(ApiError::forbidden("invite above member role").into());
            }
            let scope = body
                .client_id
                .ok_or_else(|| ApiError::invalid_param("client_id", "required for members"))?;
            require_client_role(&ctx.user, &scope, Role::Manager)?;
        }
        Role::Member => return Err(ApiError::forbidden("create invitations").into()),
    }

    let email = EmailAddress::parse(&body.email)
        .map_err(|e| ApiError::invalid_param("email", &e.0))?;
    let now = Utc::now();
    let token = generate_token();
    let invitation = state.store.create_invitation(
        &NewInvitation {
            email,
            role: body.role,
            client_id: body.client_id,
            token_hash: token_hash(&token),
            invited_by: ctx.user.id,
            expires_at: now + state.config.invite_ttl(),
        },
        now,
    )?;

    let client_name = match invitation.client_id {
        Some(client_id) => Some(state.store.get_client(&client_id)?.name),
        None => None,
    };
    let draft = invite_created_draft(&invitation, client_name.as_ref().map(|n| n.as_str()));
    state.store.enqueue_notification(&draft, now)?;

    tracing::info!(invite_id = %invitation.id, role = %invitation.role, "invitation created");
    Ok((
        StatusCode::CREATED,
        Json(InvitationCreatedResponse { invitation, token }),
    ))
}

/// Public: redeems a one-time invite token for an account and a session.
pub(crate) async fn accept_invitation_handler(
    State(state): State<AppState>,
    Json(body): Json<AcceptInviteRequest>,
) -> Result<Json<TokenResponse>, ApiFailure> {
    let name =
        PersonName::parse(&body.name).map_err(|e| ApiError::invalid_param("name", &e.0))?;
    let password_hash = hash_password(&body.password, state.config.password_iterations)
        .map_err(|e| ApiError::invalid_param("password", &e.0))?;
    let now = Utc::now();
    let (invitation, user) =
        state
            .store
            .accept_invitation(&token_hash(&body.token), &name, &password_hash, now)?;

    // Tell the inviter; skip silently if they are gone.
    if let Ok(inviter) = state.store.get_user(&invitation.invited_by) {
        let draft = invite_accepted_draft(&inviter.email, &invitation, &user.name);
        state.store.enqueue_notification(&draft, now)?;
    }

    let session_token = generate_token();
    let session = state.store.create_session(
        &user.id,
        &token_hash(&session_token),
        state.config.session_ttl(),
        now,
    )?;
    tracing::info!(user_id = %user.id, invite_id = %invitation.id, "invitation accepted");
    Ok(Json(TokenResponse {
        token: session_token,
        expires_at: session.expires_at,
    }))
}

pub(crate) async fn revoke_invitation_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Invitation>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let id = parse_invite_id(&id)?;
    let invitation = state.store.get_invitation(&id)?;
    match invitation.client_id {
        Some(client_id) => require_client_role(&ctx.user, &client_id, Role::Manager)?,
        None => crate::auth::require_admin(&ctx.user)?,
    }
    let invitation = state.store.revoke_invitation(&id)?;
    tracing::info!(invite_id = %id, "invitation revoked");
    Ok(Json(invitation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{seed_client, seed_user, session_headers};
    use timebank_model::NotificationKind;

    #[tokio::test]
    async fn invite_round_trip_creates_a_member_session() {
        let state = AppState::for_tests();
        let client = seed_client(&state, "Acme");
        let manager = seed_user(&state, "mgr@acme.example", Role::Manager, Some(client.id));

        let (status, Json(created)) = create_invitation_handler(
            State(state.clone()),
            session_headers(&state, &manager),
            Json(CreateInvitationRequest {
                email: "new@acme.example".to_string(),
                role: Role::Member,
                client_id: Some(client.id),
            }),
        )
        .await
        .expect("create");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.invitation.status, InviteStatus::Pending);

        let Json(session) = accept_invitation_handler(
            State(state.clone()),
            Json(AcceptInviteRequest {
                token: created.token,
                name: "New Member".to_string(),
                password: "long-enough-pw".to_string(),
            }),
        )
        .await
        .expect("accept");
        assert!(!session.token.is_empty());

        // Both lifecycle notifications are queued.
        let queued = state
            .store
            .list_notifications(None, 10)
            .expect("notifications");
        assert!(queued
            .iter()
            .any(|n| n.kind == NotificationKind::InviteCreated));
        assert!(queued
            .iter()
            .any(|n| n.kind == NotificationKind::InviteAccepted));
    }

    #[tokio::test]
    async fn manager_cannot_invite_managers() {
        let state = AppState::for_tests();
        let client = seed_client(&state, "Acme");
        let manager = seed_user(&state, "mgr@acme.example", Role::Manager, Some(client.id));

        let err = create_invitation_handler(
            State(state.clone()),
            session_headers(&state, &manager),
            Json(CreateInvitationRequest {
                email: "peer@acme.example".to_string(),
                role: Role::Manager,
                client_id: Some(client.id),
            }),
        )
        .await
        .expect_err("manager invite");
        assert_eq!(err.0.code, timebank_api::ApiErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn revoked_invitation_cannot_be_accepted() {
        let state = AppState::for_tests();
        let client = seed_client(&state, "Acme");
        let admin = seed_user(&state, "root@ops.example", Role::Admin, None);

        let (_, Json(created)) = create_invitation_handler(
            State(state.clone()),
            session_headers(&state, &admin),
            Json(CreateInvitationRequest {
                email: "new@acme.example".to_string(),
                role: Role::Member,
                client_id: Some(client.id),
            }),
        )
        .await
        .expect("create");

        revoke_invitation_handler(
            State(state.clone()),
            session_headers(&state, &admin),
            Path(created.invitation.id.to_string()),
        )
        .await
        .expect("revoke");

        let err = accept_invitation_handler(
            State(state),
            Json(AcceptInviteRequest {
                token: created.token,
                name: "Late".to_string(),
                password: "long-enough-pw".to_string(),
            }),
        )
        .await
        .expect_err("accept revoked");
        assert_eq!(err.0.code, timebank_api::ApiErrorCode::InvalidParameter);
    }
}
