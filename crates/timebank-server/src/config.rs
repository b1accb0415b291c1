// SPDX-License-Identifier: Apache-2.0

//! Environment-driven configuration. Every knob has a `TIMEBANK_*` variable
//! and a default that works for a single-node deployment; the startup
//! contract validator rejects combinations that cannot serve traffic.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

pub(crate) fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

pub(crate) fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Where dispatched notifications go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierKind {
    /// One JSON file per message under the given directory.
    Spool(PathBuf),
    /// POST each message to a webhook.
    HttpRelay(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub max_body_bytes: usize,
    pub session_ttl_secs: u64,
    pub invite_ttl_hours: u64,
    /// Signs list cursors; from the environment or minted and persisted in
    /// the store's meta table on first start.
    pub cursor_secret: Vec<u8>,
    pub sweep_interval: Duration,
    pub dispatch_interval: Duration,
    pub depletion_scan_interval: Duration,
    pub notify_max_attempts: u32,
    pub notify_base_backoff_ms: u64,
    pub notifier: NotifierKind,
    pub shutdown_drain_ms: u64,
    /// PBKDF2 work factor for newly hashed passwords.
    pub password_iterations: u32,
}

impl ServerConfig {
    /// Reads everything except the cursor secret, which needs the store.
    #[must_use]
    pub fn from_env() -> Self {
        let data_dir = timebank_core::resolve_timebank_data_dir();
        let db_path = env_string("TIMEBANK_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("timebank.db"));
        let notifier = match env_string("TIMEBANK_NOTIFY_WEBHOOK_URL") {
            Some(url) => NotifierKind::HttpRelay(url),
            None => NotifierKind::Spool(
                env_string("TIMEBANK_NOTIFY_SPOOL_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| data_dir.join("outbox")),
            ),
        };
        Self {
            bind_addr: env_string("TIMEBANK_BIND").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            db_path,
            max_body_bytes: env_usize("TIMEBANK_MAX_BODY_BYTES", 64 * 1024),
            session_ttl_secs: env_u64("TIMEBANK_SESSION_TTL_SECS", 12 * 60 * 60),
            invite_ttl_hours: env_u64("TIMEBANK_INVITE_TTL_HOURS", 7 * 24),
            cursor_secret: env_string("TIMEBANK_CURSOR_SECRET")
                .map(String::into_bytes)
                .unwrap_or_default(),
            sweep_interval: Duration::from_secs(env_u64("TIMEBANK_SWEEP_INTERVAL_SECS", 300)),
            dispatch_interval: Duration::from_secs(env_u64(
                "TIMEBANK_DISPATCH_INTERVAL_SECS",
                15,
            )),
            depletion_scan_interval: Duration::from_secs(env_u64(
                "TIMEBANK_DEPLETION_SCAN_INTERVAL_SECS",
                3600,
            )),
            notify_max_attempts: env_u64("TIMEBANK_NOTIFY_MAX_ATTEMPTS", 4) as u32,
            notify_base_backoff_ms: env_u64("TIMEBANK_NOTIFY_BACKOFF_MS", 30_000),
            notifier,
            shutdown_drain_ms: env_u64("TIMEBANK_SHUTDOWN_DRAIN_MS", 5000),
            password_iterations: env_u64(
                "TIMEBANK_PASSWORD_ITERATIONS",
                u64::from(timebank_core::password::DEFAULT_ITERATIONS),
            ) as u32,
        }
    }

    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl_secs.min(i64::MAX as u64) as i64)
    }

    #[must_use]
    pub fn invite_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.invite_ttl_hours.min(i64::MAX as u64) as i64)
    }
}

pub fn validate_startup_config_contract(config: &ServerConfig) -> Result<(), String> {
    if config.max_body_bytes == 0 {
        return Err("max body bytes must be > 0".to_string());
    }
    if config.session_ttl_secs == 0 {
        return Err("session ttl must be > 0".to_string());
    }
    if config.invite_ttl_hours == 0 {
        return Err("invite ttl must be > 0".to_string());
    }
    if config.cursor_secret.len() < 16 {
        return Err("cursor secret must be at least 16 bytes".to_string());
    }
    if config.sweep_interval.is_zero()
        || config.dispatch_interval.is_zero()
        || config.depletion_scan_interval.is_zero()
    {
        return Err("background intervals must be > 0".to_string());
    }
    if config.notify_max_attempts == 0 {
        return Err("notify max attempts must be > 0".to_string());
    }
    if config.password_iterations < timebank_core::password::MIN_ITERATIONS {
        return Err("password iterations below the hashing floor".to_string());
    }
    if let NotifierKind::HttpRelay(url) = &config.notifier {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("notify webhook url must be http(s), got {url}"));
        }
    }
    Ok(())
}
