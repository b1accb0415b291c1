// SPDX-License-Identifier: Apache-2.0

//! Request and response bodies. Requests carry raw strings for fields the
//! handlers validate through the model's parsers, so a bad value maps to
//! `invalid_parameter` naming the field rather than a serde rejection.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use timebank_model::{
    ClientId, Hours, Invitation, ProjectId, Role, Timebank, TimeEntry, User, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcceptInviteRequest {
    pub token: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateInvitationRequest {
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub client_id: Option<ClientId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub client_id: Option<ClientId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateClientRequest {
    pub name: String,
    pub contact_email: String,
    #[serde(default)]
    pub warn_threshold_pct: Option<u8>,
    #[serde(default)]
    pub notify_on_entry: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateClientRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub warn_threshold_pct: Option<u8>,
    #[serde(default)]
    pub notify_on_entry: Option<bool>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProjectRequest {
    pub client_id: ClientId,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTimebankRequest {
    pub client_id: ClientId,
    pub name: String,
    pub purchased_hours: Hours,
    #[serde(default)]
    pub purchased_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTimebankRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub purchased_hours: Option<Hours>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogEntryRequest {
    pub client_id: ClientId,
    pub project_id: ProjectId,
    pub hours: Hours,
    pub work_date: NaiveDate,
    #[serde(default)]
    pub note: Option<String>,
    /// Admins and managers may log on behalf of another member.
    #[serde(default)]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeResponse {
    pub user: User,
    pub session_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> ListResponse<T> {
    #[must_use]
    pub fn without_cursor(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }
}

/// Result of logging work: the entry slices that were written and the
/// post-allocation state of every bank they touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryLoggedResponse {
    pub entries: Vec<TimeEntry>,
    pub banks: Vec<Timebank>,
}

/// The invitation token appears here once and is never readable again;
/// only its hash is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvitationCreatedResponse {
    pub invitation: Invitation,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
    pub schema_version: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_request_accepts_decimal_hour_strings() {
        let raw = r#"{
            "client_id": "3e0b9f53-94a4-44a9-8dcb-6de180635a33",
            "project_id": "b8f7c9be-37c2-4b53-a06f-2f54a3a0e4d4",
            "hours": "2.50",
            "work_date": "2026-03-02"
        }"#;
        let parsed: LogEntryRequest = serde_json::from_str(raw).expect("parse");
        assert_eq!(parsed.hours, Hours::from_centihours(250));
        assert!(parsed.note.is_none());
        assert!(parsed.user_id.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = r#"{"email": "a@b.example", "password": "pw", "extra": 1}"#;
        assert!(serde_json::from_str::<LoginRequest>(raw).is_err());
    }

    #[test]
    fn patch_requests_default_to_empty() {
        let parsed: UpdateClientRequest = serde_json::from_str("{}").expect("parse");
        assert_eq!(parsed, UpdateClientRequest::default());
    }
}
