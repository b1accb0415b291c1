// SPDX-License-Identifier: Apache-2.0

use crate::{ClientId, Hours, TimebankId, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const BANK_NAME_MAX_LEN: usize = 160;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct TimebankName(String);

impl TimebankName {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("timebank name must not be empty".to_string()));
        }
        if s.len() > BANK_NAME_MAX_LEN {
            return Err(ValidationError(format!(
                "timebank name exceeds max length {BANK_NAME_MAX_LEN}"
            )));
        }
        if s.chars().any(char::is_control) {
            return Err(ValidationError(
                "timebank name must not contain control characters".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
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

impl Display for TimebankName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a purchased pool of hours.
///
/// `Exhausted` is derived from the balance (remaining at or below zero) and
/// flips back to `Active` when hours are credited. `Closed` is an operator
/// decision and removes the bank from allocation permanently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TimebankStatus {
    Active,
    Exhausted,
    Closed,
}

impl TimebankStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Exhausted => "exhausted",
            Self::Closed => "closed",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim() {
            "active" => Ok(Self::Active),
            "exhausted" => Ok(Self::Exhausted),
            "closed" => Ok(Self::Closed),
            other => Err(ValidationError(format!("unknown timebank status: {other}"))),
        }
    }

    /// Banks that participate in allocation.
    #[must_use]
    pub const fn allocatable(self) -> bool {
        matches!(self, Self::Active | Self::Exhausted)
    }
}

impl Display for TimebankStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timebank {
    pub id: TimebankId,
    pub client_id: ClientId,
    pub name: TimebankName,
    pub purchased_hours: Hours,
    pub used_hours: Hours,
    pub remaining_hours: Hours,
    pub status: TimebankStatus,
    pub purchased_at: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Timebank {
    /// `purchased - used == remaining` must hold for every persisted bank.
    #[must_use]
    pub fn balanced(&self) -> bool {
        self.purchased_hours - self.used_hours == self.remaining_hours
    }
}
