// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! HTTP service for the timebank. Thin axum handlers over `timebank-store`,
//! with the allocation planning from `timebank-ledger` on the write path and
//! background loops for sweeps and notification dispatch.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use timebank_store::Store;

mod auth;
mod background;
pub mod config;
mod failure;
mod handlers;
mod metrics;
mod middleware;
pub mod runtime;

pub use background::spawn_background_tasks;
pub use config::{
    validate_startup_config_contract, NotifierKind, ServerConfig, CONFIG_SCHEMA_VERSION,
};
pub use failure::ApiFailure;
pub use metrics::RequestMetrics;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub config: Arc<ServerConfig>,
    pub metrics: Arc<RequestMetrics>,
    pub ready: Arc<AtomicBool>,
    pub accepting: Arc<AtomicBool>,
    pub request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<Store>, config: ServerConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            metrics: Arc::new(RequestMetrics::default()),
            ready: Arc::new(AtomicBool::new(false)),
            accepting: Arc::new(AtomicBool::new(true)),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }

    /// In-memory store and a small fixed config, for handler tests.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn for_tests() -> Self {
        let store = Store::open_in_memory().expect("in-memory store");
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            db_path: PathBuf::from(":memory:"),
            max_body_bytes: 64 * 1024,
            session_ttl_secs: 3600,
            invite_ttl_hours: 24,
            cursor_secret: b"test-cursor-secret-0123456789".to_vec(),
            sweep_interval: std::time::Duration::from_secs(300),
            dispatch_interval: std::time::Duration::from_secs(15),
            depletion_scan_interval: std::time::Duration::from_secs(3600),
            notify_max_attempts: 4,
            notify_base_backoff_ms: 0,
            notifier: NotifierKind::Spool(PathBuf::from("/tmp/timebank-test-outbox")),
            shutdown_drain_ms: 0,
            password_iterations: 1_000,
        };
        Self::new(Arc::new(store), config)
    }
}

#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::system::healthz_handler))
        .route("/readyz", get(handlers::system::readyz_handler))
        .route("/version", get(handlers::system::version_handler))
        .route("/metrics", get(handlers::system::metrics_handler))
        .route("/v1/openapi.json", get(handlers::system::openapi_handler))
        .route("/v1/auth/login", post(handlers::auth::login_handler))
        .route("/v1/auth/logout", post(handlers::auth::logout_handler))
        .route("/v1/me", get(handlers::auth::me_handler))
        .route(
            "/v1/invitations",
            get(handlers::invites::list_invitations_handler)
                .post(handlers::invites::create_invitation_handler),
        )
        .route(
            "/v1/invitations/accept",
            post(handlers::invites::accept_invitation_handler),
        )
        .route(
            "/v1/invitations/:id/revoke",
            post(handlers::invites::revoke_invitation_handler),
        )
        .route(
            "/v1/users",
            get(handlers::users::list_users_handler).post(handlers::users::create_user_handler),
        )
        .route(
            "/v1/users/:id",
            get(handlers::users::get_user_handler)
                .patch(handlers::users::update_user_handler)
                .delete(handlers::users::delete_user_handler),
        )
        .route(
            "/v1/clients",
            get(handlers::clients::list_clients_handler)
                .post(handlers::clients::create_client_handler),
        )
        .route(
            "/v1/clients/:id",
            get(handlers::clients::get_client_handler)
                .patch(handlers::clients::update_client_handler)
                .delete(handlers::clients::delete_client_handler),
        )
        .route(
            "/v1/clients/:id/summary",
            get(handlers::clients::client_summary_handler),
        )
        .route(
            "/v1/clients/:id/statement.csv",
            get(handlers::clients::client_statement_handler),
        )
        .route(
            "/v1/projects",
            get(handlers::projects::list_projects_handler)
                .post(handlers::projects::create_project_handler),
        )
        .route(
            "/v1/projects/:id",
            get(handlers::projects::get_project_handler)
                .patch(handlers::projects::update_project_handler)
                .delete(handlers::projects::delete_project_handler),
        )
        .route(
            "/v1/timebanks",
            get(handlers::banks::list_timebanks_handler)
                .post(handlers::banks::create_timebank_handler),
        )
        .route(
            "/v1/timebanks/:id",
            get(handlers::banks::get_timebank_handler)
                .patch(handlers::banks::update_timebank_handler)
                .delete(handlers::banks::close_timebank_handler),
        )
        .route(
            "/v1/entries",
            get(handlers::entries::list_entries_handler)
                .post(handlers::entries::log_entry_handler),
        )
        .route(
            "/v1/entries/:id",
            get(handlers::entries::get_entry_handler)
                .delete(handlers::entries::delete_entry_handler),
        )
        .route(
            "/v1/notifications",
            get(handlers::notifications::list_notifications_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::request_tracing_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .with_state(state)
}
