// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ApiErrorCode {
    InvalidParameter,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    PayloadTooLarge,
    RateLimited,
    Internal,
    Unavailable,
}

/// The error envelope every non-2xx body carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub fn invalid_param(name: &str, reason: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidParameter,
            format!("invalid parameter: {name}"),
            json!({"parameter": name, "reason": reason}),
        )
    }

    #[must_use]
    pub fn invalid_body(reason: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidParameter,
            "invalid request body",
            json!({"reason": reason}),
        )
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(
            ApiErrorCode::Unauthorized,
            "missing or invalid credentials",
            json!({}),
        )
    }

    #[must_use]
    pub fn forbidden(action: &str) -> Self {
        Self::new(
            ApiErrorCode::Forbidden,
            format!("not allowed: {action}"),
            json!({"action": action}),
        )
    }

    #[must_use]
    pub fn not_found(resource: &str) -> Self {
        Self::new(
            ApiErrorCode::NotFound,
            format!("{resource} not found"),
            json!({"resource": resource}),
        )
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Conflict, message, json!({}))
    }

    #[must_use]
    pub fn payload_too_large(limit_bytes: u64) -> Self {
        Self::new(
            ApiErrorCode::PayloadTooLarge,
            "request body too large",
            json!({"limit_bytes": limit_bytes}),
        )
    }

    #[must_use]
    pub fn rate_limited() -> Self {
        Self::new(ApiErrorCode::RateLimited, "too many requests", json!({}))
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(ApiErrorCode::Internal, "internal error", json!({}))
    }

    #[must_use]
    pub fn unavailable(reason: &str) -> Self {
        Self::new(
            ApiErrorCode::Unavailable,
            "service unavailable",
            json!({"reason": reason}),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_snake_case() {
        let json = serde_json::to_string(&ApiErrorCode::PayloadTooLarge).expect("serialize");
        assert_eq!(json, "\"payload_too_large\"");
        let back: ApiErrorCode = serde_json::from_str("\"invalid_parameter\"").expect("parse");
        assert_eq!(back, ApiErrorCode::InvalidParameter);
    }

    #[test]
    fn invalid_param_details_name_the_field() {
        let e = ApiError::invalid_param("limit", "must be between 1 and 500");
        assert_eq!(e.code, ApiErrorCode::InvalidParameter);
        assert_eq!(e.details["parameter"], "limit");
        assert!(e.message.contains("limit"));
    }

    #[test]
    fn envelope_round_trips() {
        let e = ApiError::not_found("client");
        let raw = serde_json::to_string(&e).expect("serialize");
        let back: ApiError = serde_json::from_str(&raw).expect("parse");
        assert_eq!(back, e);
    }
}
