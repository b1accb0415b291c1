// SPDX-License-Identifier: Apache-2.0

use crate::auth::{authenticate, require_admin, require_client_role};
use crate::failure::ApiFailure;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use std::collections::BTreeMap;
use timebank_api::{
    parse_page_params, parse_statement_params, ApiError, CreateClientRequest, ListResponse,
    UpdateClientRequest,
};
use timebank_core::canonical::stable_json_hash_hex;
use timebank_model::{
    parse_warn_threshold_pct, Client, ClientId, ClientName, EmailAddress, Hours, Role,
    DEFAULT_WARN_THRESHOLD_PCT,
};
use timebank_store::{ClientPatch, NewClient};

const SUMMARY_RECENT_ENTRIES: u32 = 20;

fn parse_client_id(raw: &str) -> Result<ClientId, ApiFailure> {
    ClientId::parse(raw).map_err(|_| ApiError::invalid_param("id", "must be a uuid").into())
}

pub(crate) async fn list_clients_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<ListResponse<Client>>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let page = parse_page_params(&query)?;
    match ctx.user.role {
        Role::Admin => {
            let include_inactive = query.get("include_inactive").map(String::as_str) == Some("true");
            let clients = state.store.list_clients(include_inactive, page.limit)?;
            Ok(Json(ListResponse::without_cursor(clients)))
        }
        // Scoped callers see exactly their own client.
        _ => {
            let scope = ctx
                .user
                .client_id
                .ok_or_else(|| ApiError::forbidden("no client scope"))?;
            let client = state.store.get_client(&scope)?;
            Ok(Json(ListResponse::without_cursor(vec![client])))
        }
    }
}

pub(crate) async fn create_client_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx.user)?;

    let name =
        ClientName::parse(&body.name).map_err(|e| ApiError::invalid_param("name", &e.0))?;
    let contact_email = EmailAddress::parse(&body.contact_email)
        .map_err(|e| ApiError::invalid_param("contact_email", &e.0))?;
    let warn_threshold_pct = match body.warn_threshold_pct {
        Some(pct) => parse_warn_threshold_pct(pct)
            .map_err(|e| ApiError::invalid_param("warn_threshold_pct", &e.0))?,
        None => DEFAULT_WARN_THRESHOLD_PCT,
    };
    let client = state.store.create_client(
        &NewClient {
            name,
            contact_email,
            warn_threshold_pct,
            notify_on_entry: body.notify_on_entry.unwrap_or(false),
        },
        Utc::now(),
    )?;
    tracing::info!(client_id = %client.id, "client created");
    Ok((StatusCode::CREATED, Json(client)))
}

pub(crate) async fn get_client_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Client>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let id = parse_client_id(&id)?;
    require_client_role(&ctx.user, &id, Role::Member)?;
    let client = state.store.get_client(&id)?;
    Ok(Json(client))
}

pub(crate) async fn update_client_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateClientRequest>,
) -> Result<Json<Client>, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx.user)?;
    let id = parse_client_id(&id)?;

    let name = match &body.name {
        Some(raw) => {
            Some(ClientName::parse(raw).map_err(|e| ApiError::invalid_param("name", &e.0))?)
        }
        None => None,
    };
    let contact_email = match &body.contact_email {
        Some(raw) => Some(
            EmailAddress::parse(raw)
                .map_err(|e| ApiError::invalid_param("contact_email", &e.0))?,
        ),
        None => None,
    };
    let warn_threshold_pct = match body.warn_threshold_pct {
        Some(pct) => Some(
            parse_warn_threshold_pct(pct)
                .map_err(|e| ApiError::invalid_param("warn_threshold_pct", &e.0))?,
        ),
        None => None,
    };
    let client = state.store.update_client(
        &id,
        &ClientPatch {
            name,
            contact_email,
            warn_threshold_pct,
            notify_on_entry: body.notify_on_entry,
            active: body.active,
        },
    )?;
    Ok(Json(client))
}

pub(crate) async fn delete_client_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx.user)?;
    let id = parse_client_id(&id)?;
    state.store.deactivate_client(&id)?;
    tracing::info!(client_id = %id, "client deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// Aggregate view of a client's banks, projects and recent entries. The
/// response carries a strong ETag over its canonical JSON so dashboards can
/// poll with `If-None-Match` and get a 304 when nothing changed.
pub(crate) async fn client_summary_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let id = parse_client_id(&id)?;
    require_client_role(&ctx.user, &id, Role::Member)?;

    let summary = state.store.client_summary(&id, SUMMARY_RECENT_ENTRIES)?;
    let etag = format!(
        "\"{}\"",
        stable_json_hash_hex(&summary).map_err(|_| ApiError::internal())?
    );
    if let Some(candidate) = headers.get(header::IF_NONE_MATCH).and_then(|v| v.to_str().ok()) {
        if candidate == etag {
            return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
        }
    }
    Ok((
        StatusCode::OK,
        [(header::ETAG, etag)],
        Json(summary),
    )
        .into_response())
}

/// CSV statement, one row per entry slice plus a trailing totals row.
pub(crate) async fn client_statement_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Response, ApiFailure> {
    let ctx = authenticate(&state, &headers)?;
    let id = parse_client_id(&id)?;
    require_client_role(&ctx.user, &id, Role::Manager)?;
    let params = parse_statement_params(&query)?;

    let rows = state.store.statement_rows(&id, params.from, params.to)?;
    let body = render_statement_csv(&rows).map_err(|_| ApiError::internal())?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"statement.csv\"".to_string(),
            ),
        ],
        body,
    )
        .into_response())
}

fn render_statement_csv(
    rows: &[timebank_store::StatementRow],
) -> Result<String, Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["work_date", "project", "person", "bank", "hours", "note"])?;
    let mut total = Hours::ZERO;
    for row in rows {
        total += row.hours;
        writer.write_record([
            row.work_date.to_string().as_str(),
            row.project.as_str(),
            row.person.as_str(),
            row.bank.as_str(),
            row.hours.to_string().as_str(),
            row.note.as_deref().unwrap_or(""),
        ])?;
    }
    writer.write_record(["total", "", "", "", total.to_string().as_str(), ""])?;
    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}
