// SPDX-License-Identifier: Apache-2.0

//! Outbox dispatch loop body. One call drains the currently-due rows; the
//! server runs this on an interval.

use crate::retry::BackoffPolicy;
use crate::{Notifier, RetryPolicy};
use chrono::{DateTime, Utc};
use timebank_model::NotificationStatus;
use timebank_store::{Store, StoreError};
use tracing::{debug, warn};

const DISPATCH_BATCH: u32 = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub sent: u64,
    pub retried: u64,
    pub failed: u64,
}

impl DispatchStats {
    #[must_use]
    pub const fn attempted(&self) -> u64 {
        self.sent + self.retried + self.failed
    }
}

/// Delivers every queued notification whose next attempt is due. A delivery
/// error requeues the row with a backoff, or marks it failed once the policy
/// is out of attempts. Store errors abort the pass; delivery errors do not.
pub async fn dispatch_due(
    store: &Store,
    notifier: &dyn Notifier,
    policy: &RetryPolicy,
    now: DateTime<Utc>,
) -> Result<DispatchStats, StoreError> {
    let mut stats = DispatchStats::default();
    let due = store.due_notifications(now, DISPATCH_BATCH)?;
    for notification in due {
        match notifier.deliver(&notification).await {
            Ok(()) => {
                store.mark_notification_sent(&notification.id, now)?;
                stats.sent += 1;
                debug!(
                    id = %notification.id,
                    kind = %notification.kind,
                    backend = notifier.name(),
                    "notification delivered"
                );
            }
            Err(err) => {
                let next_attempt = notification.attempts + 1;
                let delay = policy.delay_for_attempt(next_attempt);
                let retry_in = chrono::Duration::milliseconds(
                    i64::try_from(delay.as_millis()).unwrap_or(i64::MAX),
                );
                let status = store.mark_notification_failed(
                    &notification.id,
                    &err.0,
                    Some(retry_in),
                    policy.max_attempts,
                    now,
                )?;
                if status == NotificationStatus::Failed {
                    stats.failed += 1;
                } else {
                    stats.retried += 1;
                }
                warn!(
                    id = %notification.id,
                    kind = %notification.kind,
                    backend = notifier.name(),
                    attempt = next_attempt,
                    status = %status,
                    error = %err,
                    "notification delivery failed"
                );
            }
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryNotifier;
    use chrono::Utc;
    use timebank_model::{EmailAddress, NotificationDraft, NotificationKind};

    fn draft(key: &str) -> NotificationDraft {
        NotificationDraft {
            kind: NotificationKind::DepletionWarning,
            dedupe_key: key.to_string(),
            recipient: EmailAddress::parse("ops@acme.example").expect("email"),
            subject: "Running low".to_string(),
            body: "7.00 of 40.00 purchased hours remain.".to_string(),
        }
    }

    #[tokio::test]
    async fn delivers_due_rows_and_marks_them_sent() {
        let store = Store::open_in_memory().expect("store");
        let now = Utc::now();
        store
            .enqueue_notification(&draft("depletion:a:warning"), now)
            .expect("enqueue");
        store
            .enqueue_notification(&draft("depletion:b:warning"), now)
            .expect("enqueue");

        let notifier = MemoryNotifier::default();
        let stats = dispatch_due(&store, &notifier, &RetryPolicy::default(), now)
            .await
            .expect("dispatch");

        assert_eq!(stats.sent, 2);
        assert_eq!(stats.attempted(), 2);
        assert_eq!(notifier.delivered().len(), 2);
        assert!(store
            .due_notifications(now + chrono::Duration::hours(1), 10)
            .expect("due")
            .is_empty());
    }

    #[tokio::test]
    async fn delivery_error_requeues_with_backoff() {
        let store = Store::open_in_memory().expect("store");
        let now = Utc::now();
        store
            .enqueue_notification(&draft("depletion:a:warning"), now)
            .expect("enqueue");

        let notifier = MemoryNotifier::default();
        notifier.fail_next_with("relay unreachable");
        let policy = RetryPolicy {
            max_attempts: 4,
            base_backoff_ms: 30_000,
        };
        let stats = dispatch_due(&store, &notifier, &policy, now)
            .await
            .expect("dispatch");
        assert_eq!(stats.retried, 1);
        assert_eq!(stats.sent, 0);

        // Not due again until the backoff elapses.
        assert!(store.due_notifications(now, 10).expect("due").is_empty());
        let later = now + chrono::Duration::milliseconds(30_001);
        let retried = store.due_notifications(later, 10).expect("due");
        assert_eq!(retried.len(), 1);
        assert_eq!(retried[0].attempts, 1);
        assert_eq!(retried[0].last_error.as_deref(), Some("relay unreachable"));
    }

    #[tokio::test]
    async fn exhausted_attempts_mark_the_row_failed() {
        let store = Store::open_in_memory().expect("store");
        let now = Utc::now();
        store
            .enqueue_notification(&draft("depletion:a:warning"), now)
            .expect("enqueue");

        let notifier = MemoryNotifier::default();
        let policy = RetryPolicy {
            max_attempts: 2,
            base_backoff_ms: 0,
        };
        for _ in 0..2 {
            notifier.fail_next_with("relay unreachable");
            dispatch_due(&store, &notifier, &policy, now)
                .await
                .expect("dispatch");
        }

        let failed = store
            .list_notifications(Some(NotificationStatus::Failed), 10)
            .expect("list");
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].attempts, 2);
        assert!(store.due_notifications(now, 10).expect("due").is_empty());
    }
}
