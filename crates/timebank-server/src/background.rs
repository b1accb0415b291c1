// SPDX-License-Identifier: Apache-2.0

//! Periodic loops: session/invitation sweeps, notification dispatch, and the
//! standing depletion re-scan. Each loop stops when the shutdown flag flips.

use crate::config::NotifierKind;
use crate::AppState;
use chrono::Utc;
use std::sync::Arc;
use timebank_ledger::standing_signal;
use timebank_notify::{depletion_draft, HttpRelayNotifier, Notifier, RetryPolicy, SpoolNotifier};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

fn build_notifier(kind: &NotifierKind) -> Arc<dyn Notifier> {
    match kind {
        NotifierKind::Spool(dir) => Arc::new(SpoolNotifier::new(dir.clone())),
        NotifierKind::HttpRelay(url) => Arc::new(HttpRelayNotifier::new(url.clone())),
    }
}

/// Spawns the three maintenance loops. They exit once `shutdown` turns true.
pub fn spawn_background_tasks(
    state: &AppState,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(sweep_loop(state.clone(), shutdown.clone())),
        tokio::spawn(dispatch_loop(state.clone(), shutdown.clone())),
        tokio::spawn(depletion_scan_loop(state.clone(), shutdown)),
    ]
}

async fn sweep_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut tick = tokio::time::interval(state.config.sweep_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = tick.tick() => run_sweep(&state),
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

fn run_sweep(state: &AppState) {
    let now = Utc::now();
    match state.store.sweep_expired_sessions(now) {
        Ok(0) => {}
        Ok(n) => debug!(swept = n, "expired sessions removed"),
        Err(e) => warn!(error = %e, "session sweep failed"),
    }
    match state.store.expire_stale_invitations(now) {
        Ok(0) => {}
        Ok(n) => debug!(expired = n, "stale invitations expired"),
        Err(e) => warn!(error = %e, "invitation sweep failed"),
    }
}

async fn dispatch_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let notifier = build_notifier(&state.config.notifier);
    let policy = RetryPolicy {
        max_attempts: state.config.notify_max_attempts,
        base_backoff_ms: state.config.notify_base_backoff_ms,
    };
    let mut tick = tokio::time::interval(state.config.dispatch_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                match timebank_notify::dispatch_due(&state.store, notifier.as_ref(), &policy, Utc::now())
                    .await
                {
                    Ok(stats) if stats.attempted() > 0 => {
                        debug!(
                            sent = stats.sent,
                            retried = stats.retried,
                            failed = stats.failed,
                            "notification dispatch round"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "notification dispatch failed"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

async fn depletion_scan_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut tick = tokio::time::interval(state.config.depletion_scan_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = tick.tick() => run_depletion_scan(&state),
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

/// Re-announces standing low-balance states. Dedupe keys make this
/// idempotent: a signal already queued for a bank is not queued again.
fn run_depletion_scan(state: &AppState) {
    let rows = match state.store.depletion_scan_rows() {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, "depletion scan query failed");
            return;
        }
    };
    let now = Utc::now();
    for row in rows {
        let Some(signal) = standing_signal(
            row.bank.purchased_hours,
            row.bank.remaining_hours,
            row.warn_threshold_pct,
        ) else {
            continue;
        };
        let draft = depletion_draft(&row.client_name, &row.contact_email, &row.bank, signal);
        match state.store.enqueue_notification(&draft, now) {
            Ok(Some(id)) => debug!(notification_id = %id, bank_id = %row.bank.id, "depletion signal queued"),
            Ok(None) => {}
            Err(e) => warn!(error = %e, bank_id = %row.bank.id, "depletion enqueue failed"),
        }
    }
}
