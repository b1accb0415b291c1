#![forbid(unsafe_code)]
//! Stakeholder notifications.
//!
//! Messages are queued in the store's outbox by the write path and delivered
//! here. Delivery transport is behind the [`Notifier`] trait: an in-memory
//! sink for tests, a filesystem spool, and an HTTP webhook relay. The
//! dispatch loop drains due rows with bounded retry and marks them
//! `sent`/`failed`.

use std::fmt::{Display, Formatter};
use timebank_model::Notification;

mod backends;
mod compose;
mod dispatch;
mod retry;

pub use backends::{HttpRelayNotifier, MemoryNotifier, SpoolNotifier};
pub use compose::{
    depletion_draft, entry_logged_draft, invite_accepted_draft, invite_created_draft,
    slice_drafts_for_allocation,
};
pub use dispatch::{dispatch_due, DispatchStats};
pub use retry::{BackoffPolicy, RetryPolicy};

pub const CRATE_NAME: &str = "timebank-notify";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError(pub String);

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NotifyError {}

/// Delivery transport. Implementations must be safe to call concurrently;
/// the dispatcher delivers one message at a time but several dispatchers may
/// share a backend.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
