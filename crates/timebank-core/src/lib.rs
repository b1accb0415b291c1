#![forbid(unsafe_code)]

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub mod canonical;
pub mod password;
pub mod token;

pub const CRATE_NAME: &str = "timebank-core";

pub const ENV_TIMEBANK_LOG_LEVEL: &str = "TIMEBANK_LOG_LEVEL";
pub const ENV_TIMEBANK_DATA_DIR: &str = "TIMEBANK_DATA_DIR";

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExitCode {
    Success = 0,
    Usage = 2,
    Validation = 3,
    DependencyFailure = 4,
    Internal = 10,
}

impl ExitCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Usage => "usage",
            Self::Validation => "validation",
            Self::DependencyFailure => "dependency_failure",
            Self::Internal => "internal",
        }
    }
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Resolves the directory holding the sqlite database and notification spool.
///
/// Order: `TIMEBANK_DATA_DIR`, then `XDG_DATA_HOME/timebank`, then
/// `~/.local/share/timebank`, falling back to `.timebank` in the working
/// directory.
#[must_use]
pub fn resolve_timebank_data_dir() -> PathBuf {
    if let Ok(explicit) = std::env::var(ENV_TIMEBANK_DATA_DIR) {
        let trimmed = explicit.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        let trimmed = xdg_data_home.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed).join("timebank");
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed)
                .join(".local")
                .join("share")
                .join("timebank");
        }
    }

    PathBuf::from(".timebank")
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl MachineError {
    #[must_use]
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for MachineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn machine_error_serializes_with_sorted_details() {
        let err = MachineError::new("validation", "bad hours")
            .with_detail("field", "hours")
            .with_detail("actual", "-1");
        let json = serde_json::to_string(&err).expect("serialize");
        assert!(json.contains("\"code\":\"validation\""));
        let idx_actual = json.find("actual").expect("actual key");
        let idx_field = json.find("field").expect("field key");
        assert!(idx_actual < idx_field);
    }

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(ExitCode::Success as u8, 0);
        assert_eq!(ExitCode::Usage as u8, 2);
        assert_eq!(ExitCode::Validation as u8, 3);
        assert_eq!(ExitCode::DependencyFailure as u8, 4);
        assert_eq!(ExitCode::Internal as u8, 10);
        assert_eq!(ExitCode::DependencyFailure.as_str(), "dependency_failure");
    }
}
