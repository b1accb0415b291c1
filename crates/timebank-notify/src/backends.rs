use crate::{Notifier, NotifyError};
use std::path::PathBuf;
use std::sync::Mutex;
use timebank_model::Notification;
use tracing::debug;

/// Test sink: records every delivered message, optionally failing each
/// delivery with a scripted error.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    delivered: Mutex<Vec<Notification>>,
    fail_with: Mutex<Option<String>>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_with(&self, message: &str) {
        if let Ok(mut guard) = self.fail_with.lock() {
            *guard = Some(message.to_string());
        }
    }

    #[must_use]
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Notifier for MemoryNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        if let Ok(mut guard) = self.fail_with.lock() {
            if let Some(message) = guard.take() {
                return Err(NotifyError(message));
            }
        }
        self.delivered
            .lock()
            .map_err(|_| NotifyError("memory notifier poisoned".to_string()))?
            .push(notification.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Writes one JSON file per message under a spool directory. An external
/// mailer (or an operator) picks them up from there.
#[derive(Debug, Clone)]
pub struct SpoolNotifier {
    dir: PathBuf,
}

impl SpoolNotifier {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait::async_trait]
impl Notifier for SpoolNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| NotifyError(format!("create spool dir {}: {e}", self.dir.display())))?;
        let path = self.dir.join(format!("{}.json", notification.id));
        let bytes = serde_json::to_vec_pretty(notification)
            .map_err(|e| NotifyError(format!("serialize notification: {e}")))?;
        std::fs::write(&path, bytes)
            .map_err(|e| NotifyError(format!("write {}: {e}", path.display())))?;
        debug!(notification_id = %notification.id, path = %path.display(), "spooled notification");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "spool"
    }
}

/// POSTs each message as JSON to a configured webhook. The receiving side
/// owns actual email delivery; a non-2xx response counts as a failed attempt.
#[derive(Debug, Clone)]
pub struct HttpRelayNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpRelayNotifier {
    #[must_use]
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for HttpRelayNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| NotifyError(format!("relay request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError(format!(
                "relay returned {status} for notification {}",
                notification.id
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http_relay"
    }
}
