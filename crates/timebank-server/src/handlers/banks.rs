// SPDX-License-Identifier: Apache-2.0

use crate::auth::{authenticate, require_admin, require_client_role};
use crate::failure::ApiFailure;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use std::collections::BTreeMap;
use timebank_api::{
    parse_page_params, ApiError, CreateTimebankRequest, ListResponse, UpdateTimebankRequest,
};
use timebank_model::{ClientId, Role, Timebank, TimebankId, TimebankName, TimebankStatus};
use timebank_store::{NewTimebank, TimebankPatch};

fn parse_bank_id(raw: &str) -> Result<TimebankId, ApiFailure> {
    TimebankId::parse(raw).map_err(|_| ApiError::invalid_param("id", "must be a uuid").into())
}

pub(crate) async fn list_timebanks_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<ListResponse<Timebank>>, ApiFailure> {
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
        _ => Some(
            ctx.user
                .client_id
                .ok_or_else(|| ApiError::forbidden("no client scope"))?,
        ),
    };
    let status = match query.get("status") {
        Some(raw) => Some(
            TimebankStatus::parse(raw)
                .map_err(|_| ApiError::invalid_param("status", "unknown bank status"))?,
        ),
        None => None,
    };
    let banks = state.store.list_timebanks(scope.as_ref(), status, page.limit)?;
    Ok(Json(ListResponse::without_cursor(banks)))
}

pub(crate) async fn create_timebank_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateTimebankRequest>,
) -> Result<(StatusCode, Json<Timebank>), ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx.user)?;

    if !body.purchased_hours.is_positive() {
        return Err(ApiError::invalid_param("purchased_hours", "must be positive").into());
    }
    let name =
        TimebankName::parse(&body.name).map_err(|e| ApiError::invalid_param("name", &e.0))?;
    let now = Utc::now();
    let bank = state.store.create_timebank(
        &NewTimebank {
            client_id: body.client_id,
            name,
            purchased_hours: body.purchased_hours,
            purchased_at: body.purchased_at.unwrap_or_else(|| now.date_naive()),
        },
        now,
    )?;
    tracing::info!(bank_id = %bank.id, client_id = %bank.client_id, "timebank created");
    Ok((StatusCode::CREATED, Json(bank)))
}

pub(crate) async fn get_timebank_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Timebank>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let id = parse_bank_id(&id)?;
    let bank = state.store.get_timebank(&id)?;
    require_client_role(&ctx.user, &bank.client_id, Role::Member)?;
    Ok(Json(bank))
}

pub(crate) async fn update_timebank_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateTimebankRequest>,
) -> Result<Json<Timebank>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx.user)?;
    let id = parse_bank_id(&id)?;

    let name = match &body.name {
        Some(raw) => {
            Some(TimebankName::parse(raw).map_err(|e| ApiError::invalid_param("name", &e.0))?)
        }
        None => None,
    };
    let bank = state.store.update_timebank(
        &id,
        &TimebankPatch {
            name,
            purchased_hours: body.purchased_hours,
        },
    )?;
    Ok(Json(bank))
}

/// Closing a bank removes it from allocation; its history stays queryable.
pub(crate) async fn close_timebank_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Timebank>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx.user)?;
    let id = parse_bank_id(&id)?;
    let bank = state.store.close_timebank(&id)?;
    tracing::info!(bank_id = %id, "timebank closed");
    Ok(Json(bank))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{seed_client, seed_user, session_headers};
    use timebank_model::Hours;

    #[tokio::test]
    async fn admin_creates_bank_and_scoped_member_reads_it() {
        let state = AppState::for_tests();
        let client = seed_client(&state, "Acme");
        let admin = seed_user(&state, "root@ops.example", Role::Admin, None);
        let member = seed_user(&state, "m@acme.example", Role::Member, Some(client.id));

        let response = create_timebank_handler(
            State(state.clone()),
            session_headers(&state, &admin),
            Json(CreateTimebankRequest {
                client_id: client.id,
                name: "Q1 retainer".to_string(),
                purchased_hours: Hours::from_centihours(4_000),
                purchased_at: None,
            }),
        )
        .await
        .expect("create");
        assert_eq!(response.0, StatusCode::CREATED);

        let banks = state
            .store
            .list_timebanks(Some(&client.id), None, 10)
            .expect("list");
        assert_eq!(banks.len(), 1);

        get_timebank_handler(
            State(state.clone()),
            session_headers(&state, &member),
            Path(banks[0].id.to_string()),
        )
        .await
        .expect("member read");
    }

    #[tokio::test]
    async fn zero_hour_bank_is_rejected() {
        let state = AppState::for_tests();
        let client = seed_client(&state, "Acme");
        let admin = seed_user(&state, "root@ops.example", Role::Admin, None);

        let err = create_timebank_handler(
            State(state.clone()),
            session_headers(&state, &admin),
            Json(CreateTimebankRequest {
                client_id: client.id,
                name: "Empty".to_string(),
                purchased_hours: Hours::ZERO,
                purchased_at: None,
            }),
        )
        .await
        .expect_err("zero hours");
        assert_eq!(err.0.code, timebank_api::ApiErrorCode::InvalidParameter);
    }
}
