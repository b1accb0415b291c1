// SPDX-License-Identifier: Apache-2.0

use crate::auth::{authenticate, bearer_token};
use crate::failure::ApiFailure;
use crate::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use timebank_api::{ApiError, LoginRequest, MeResponse, TokenResponse};
use timebank_core::password::verify_password;
use timebank_core::token::{generate_token, token_hash};
use timebank_model::EmailAddress;

pub(crate) async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiFailure> {
    let email = EmailAddress::parse(&body.email)
        .map_err(|_| ApiError::unauthorized())?;
    let user = state
        .store
        .find_user_by_email(&email)?
        .filter(|u| u.active)
        .ok_or_else(ApiError::unauthorized)?;
    let stored = state.store.user_password_hash(&user.id)?;
    let verified = verify_password(&body.password, &stored)
        .map_err(|_| ApiError::unauthorized())?;
    if !verified {
        return Err(ApiError::unauthorized().into());
    }

    let token = generate_token();
    let session = state.store.create_session(
        &user.id,
        &token_hash(&token),
        state.config.session_ttl(),
        Utc::now(),
    )?;
    tracing::info!(user_id = %user.id, "login");
    Ok(Json(TokenResponse {
        token,
        expires_at: session.expires_at,
    }))
}

pub(crate) async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiFailure> {
    // Authenticate first so a bad token cannot probe session existence.
    authenticate(&state, &headers)?;
    if let Some(token) = bearer_token(&headers) {
        state.store.delete_session(&token_hash(&token))?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn me_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    Ok(Json(MeResponse {
        user: ctx.user,
        session_expires_at: ctx.session_expires_at,
    }))
}
