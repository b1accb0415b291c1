use crate::{ClientId, EmailAddress, ProjectId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const LABEL_MAX_LEN: usize = 160;
pub const DEFAULT_WARN_THRESHOLD_PCT: u8 = 20;

fn parse_label(input: &str, what: &str) -> Result<String, ValidationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ValidationError(format!("{what} must not be empty")));
    }
    if s.len() > LABEL_MAX_LEN {
        return Err(ValidationError(format!(
            "{what} exceeds max length {LABEL_MAX_LEN}"
        )));
    }
    if s.chars().any(char::is_control) {
        return Err(ValidationError(format!(
            "{what} must not contain control characters"
        )));
    }
    Ok(s.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct ClientName(String);

impl ClientName {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        parse_label(input, "client name").map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for ClientName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct ProjectName(String);

impl ProjectName {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        parse_label(input, "project name").map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for ProjectName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Percentage of purchased hours below which a depletion warning fires.
pub fn parse_warn_threshold_pct(value: u8) -> Result<u8, ValidationError> {
    if (1..=99).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError(format!(
            "warn threshold must be between 1 and 99 percent, got {value}"
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Client {
    pub id: ClientId,
    pub name: ClientName,
    pub contact_email: EmailAddress,
    pub warn_threshold_pct: u8,
    /// When set, every logged entry is echoed to the contact address.
    pub notify_on_entry: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    pub id: ProjectId,
    pub client_id: ClientId,
    pub name: ProjectName,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
