// SPDX-License-Identifier: Apache-2.0

//! Process entry points shared by the `timebank-server` binary and the
//! CLI's `serve` subcommand.

use crate::{
    build_router, spawn_background_tasks, validate_startup_config_contract, AppState, ServerConfig,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use timebank_store::Store;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CURSOR_SECRET_META_KEY: &str = "cursor_secret";

/// Installs the global subscriber. `TIMEBANK_LOG_LEVEL` feeds the env
/// filter; `TIMEBANK_LOG_JSON=1` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(timebank_core::ENV_TIMEBANK_LOG_LEVEL)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("TIMEBANK_LOG_JSON").map(|v| v == "1" || v == "true") == Ok(true) {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Uses the secret from the environment, or mints a random one on first
/// start and persists it in the store's meta table so cursors survive
/// restarts.
fn resolve_cursor_secret(store: &Store, config: &mut ServerConfig) -> Result<(), String> {
    if !config.cursor_secret.is_empty() {
        return Ok(());
    }
    if let Some(stored) = store
        .meta(CURSOR_SECRET_META_KEY)
        .map_err(|e| e.to_string())?
    {
        config.cursor_secret = stored.into_bytes();
        return Ok(());
    }
    let mut raw = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut raw);
    let encoded = URL_SAFE_NO_PAD.encode(raw);
    store
        .set_meta(CURSOR_SECRET_META_KEY, &encoded)
        .map_err(|e| e.to_string())?;
    config.cursor_secret = encoded.into_bytes();
    info!("minted a new cursor-signing secret");
    Ok(())
}

/// Opens the store, binds the listener, and serves until SIGINT/SIGTERM.
pub async fn run() -> Result<(), String> {
    let mut config = ServerConfig::from_env();

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create data directory {}: {e}", parent.display()))?;
    }
    let store = Store::open(&config.db_path)
        .map_err(|e| format!("cannot open {}: {e}", config.db_path.display()))?;
    resolve_cursor_secret(&store, &mut config)?;
    validate_startup_config_contract(&config)?;

    let state = AppState::new(Arc::new(store), config);
    state.store.ping().map_err(|e| e.to_string())?;
    state.ready.store(true, Ordering::Relaxed);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let tasks = spawn_background_tasks(&state, shutdown_rx);

    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr)
        .await
        .map_err(|e| format!("cannot bind {}: {e}", state.config.bind_addr))?;
    info!(
        addr = %state.config.bind_addr,
        db = %state.config.db_path.display(),
        schema = state.store.schema_version().map_err(|e| e.to_string())?,
        "timebank-server listening"
    );

    let drain_ms = state.config.shutdown_drain_ms;
    let accepting = state.accepting.clone();
    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            wait_for_signal().await;
            info!("shutdown signal received, draining");
            accepting.store(false, Ordering::Relaxed);
            let _ = shutdown_tx.send(true);
            tokio::time::sleep(Duration::from_millis(drain_ms)).await;
        })
        .await
        .map_err(|e| format!("server error: {e}"))?;

    for task in tasks {
        task.abort();
    }
    info!("timebank-server stopped");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
