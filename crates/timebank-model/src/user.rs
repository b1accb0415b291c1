use crate::{ClientId, UserId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const EMAIL_MAX_LEN: usize = 254;
pub const EMAIL_MIN_LEN: usize = 3;
pub const PERSON_NAME_MAX_LEN: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim().to_ascii_lowercase();
        if s.len() < EMAIL_MIN_LEN {
            return Err(ValidationError("email is too short".to_string()));
        }
        if s.len() > EMAIL_MAX_LEN {
            return Err(ValidationError(format!(
                "email exceeds max length {EMAIL_MAX_LEN}"
            )));
        }
        let (local, domain) = s
            .split_once('@')
            .ok_or_else(|| ValidationError("email must contain '@'".to_string()))?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(ValidationError(
                "email must have one non-empty local and domain part".to_string(),
            ));
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(ValidationError("email domain is malformed".to_string()));
        }
        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValidationError(
                "email must not contain whitespace or control characters".to_string(),
            ));
        }
        Ok(Self(s))
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

impl Display for EmailAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct PersonName(String);

impl PersonName {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("name must not be empty".to_string()));
        }
        if s.len() > PERSON_NAME_MAX_LEN {
            return Err(ValidationError(format!(
                "name exceeds max length {PERSON_NAME_MAX_LEN}"
            )));
        }
        if s.chars().any(char::is_control) {
            return Err(ValidationError(
                "name must not contain control characters".to_string(),
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

impl Display for PersonName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access tier. Managers and members are scoped to a single client;
/// admins see every tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Member,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Member => "member",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "member" => Ok(Self::Member),
            other => Err(ValidationError(format!("unknown role: {other}"))),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Admin accounts span all clients; manager and member accounts (and
/// invitations for them) must be scoped to exactly one.
pub fn check_role_scope(role: Role, client_id: Option<&ClientId>) -> Result<(), ValidationError> {
    match (role, client_id) {
        (Role::Admin, Some(_)) => Err(ValidationError(
            "admin accounts must not be scoped to a client".to_string(),
        )),
        (Role::Manager | Role::Member, None) => Err(ValidationError(format!(
            "{role} accounts require a client scope"
        ))),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct User {
    pub id: UserId,
    pub email: EmailAddress,
    pub name: PersonName,
    pub role: Role,
    /// Tenant scope for managers and members; admins carry none.
    pub client_id: Option<ClientId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_lowercased_and_trimmed() {
        let email = EmailAddress::parse("  Pat@Example.COM ").expect("parse");
        assert_eq!(email.as_str(), "pat@example.com");
    }

    #[test]
    fn email_rejects_missing_at_and_bad_domain() {
        assert!(EmailAddress::parse("pat.example.com").is_err());
        assert!(EmailAddress::parse("pat@").is_err());
        assert!(EmailAddress::parse("@example.com").is_err());
        assert!(EmailAddress::parse("pat@localhost").is_err());
        assert!(EmailAddress::parse("pat@example.com.").is_err());
        assert!(EmailAddress::parse("p at@example.com").is_err());
    }

    #[test]
    fn person_name_rejects_control_characters() {
        assert!(PersonName::parse("Pat\u{7}").is_err());
        assert!(PersonName::parse("   ").is_err());
        assert_eq!(PersonName::parse(" Pat Doe ").expect("ok").as_str(), "Pat Doe");
    }

    #[test]
    fn scope_rules_per_role() {
        let client = ClientId::new();
        assert!(check_role_scope(Role::Admin, None).is_ok());
        assert!(check_role_scope(Role::Admin, Some(&client)).is_err());
        assert!(check_role_scope(Role::Member, Some(&client)).is_ok());
        assert!(check_role_scope(Role::Member, None).is_err());
        assert!(check_role_scope(Role::Manager, None).is_err());
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in [Role::Admin, Role::Manager, Role::Member] {
            assert_eq!(Role::parse(role.as_str()).expect("parse"), role);
        }
        assert!(Role::parse("owner").is_err());
    }
}
