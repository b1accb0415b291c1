use crate::{EmailAddress, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|_| ValidationError("notification id is not a valid uuid".to_string()))
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for NotificationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DepletionWarning,
    Exhausted,
    Overdrawn,
    InviteCreated,
    InviteAccepted,
    EntryLogged,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DepletionWarning => "depletion_warning",
            Self::Exhausted => "exhausted",
            Self::Overdrawn => "overdrawn",
            Self::InviteCreated => "invite_created",
            Self::InviteAccepted => "invite_accepted",
            Self::EntryLogged => "entry_logged",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim() {
            "depletion_warning" => Ok(Self::DepletionWarning),
            "exhausted" => Ok(Self::Exhausted),
            "overdrawn" => Ok(Self::Overdrawn),
            "invite_created" => Ok(Self::InviteCreated),
            "invite_accepted" => Ok(Self::InviteAccepted),
            "entry_logged" => Ok(Self::EntryLogged),
            other => Err(ValidationError(format!("unknown notification kind: {other}"))),
        }
    }
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Queued,
    Sent,
    Failed,
}

impl NotificationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim() {
            "queued" => Ok(Self::Queued),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(ValidationError(format!(
                "unknown notification status: {other}"
            ))),
        }
    }
}

impl Display for NotificationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message composed but not yet queued. The write path builds drafts and
/// hands them to the store together with the change that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationDraft {
    pub kind: NotificationKind,
    pub dedupe_key: String,
    pub recipient: EmailAddress,
    pub subject: String,
    pub body: String,
}

/// Outbox row. Messages are queued in the same transaction as the change
/// that caused them and delivered by the dispatch loop afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    /// Collapses repeats: a live key is enqueued at most once.
    pub dedupe_key: String,
    pub recipient: EmailAddress,
    pub subject: String,
    pub body: String,
    pub status: NotificationStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}
