// SPDX-License-Identifier: Apache-2.0

use crate::failure::ApiFailure;
use crate::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::atomic::Ordering;
use timebank_api::{openapi_v1_spec, ApiError, VersionResponse};
use timebank_store::SQLITE_SCHEMA_VERSION;

pub(crate) async fn healthz_handler() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub(crate) async fn readyz_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiFailure> {
    if !state.accepting.load(Ordering::Relaxed) {
        return Err(ApiError::unavailable("draining").into());
    }
    if !state.ready.load(Ordering::Relaxed) {
        return Err(ApiError::unavailable("starting").into());
    }
    state.store.ping()?;
    Ok(Json(json!({"status": "ready"})))
}

pub(crate) async fn version_handler() -> impl IntoResponse {
    Json(VersionResponse {
        name: "timebank-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: SQLITE_SCHEMA_VERSION,
    })
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.render(),
    )
}

pub(crate) async fn openapi_handler() -> impl IntoResponse {
    Json(openapi_v1_spec())
}
