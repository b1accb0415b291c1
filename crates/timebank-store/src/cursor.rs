// SPDX-License-Identifier: Apache-2.0

//! Opaque keyset-pagination cursors for entry listings.
//!
//! Token shape is `v1.<payload>.<sig>`: a base64url JSON payload signed with
//! HMAC-SHA256. The payload binds the query hash and sort order, so a cursor
//! minted for one filter combination is rejected when replayed against
//! another.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const CURSOR_VERSION_V1: &str = "v1";
pub const MAX_CURSOR_TOKEN_LEN: usize = 1024;
const MAX_PAYLOAD_PART_LEN: usize = 768;
const MAX_SIG_PART_LEN: usize = 128;

pub(crate) const ENTRY_ORDER: &str = "logged_at_desc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CursorErrorCode {
    InvalidFormat,
    UnsupportedVersion,
    InvalidSignature,
    InvalidPayload,
    QueryHashMismatch,
    OrderMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorError {
    pub code: CursorErrorCode,
    pub message: String,
}

impl CursorError {
    #[must_use]
    pub fn new(code: CursorErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CursorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for CursorError {}

/// Keyset position after the last row the previous page returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryCursor {
    pub order: String,
    /// RFC 3339 `logged_at` of the last row; lexicographic order matches
    /// chronological order.
    pub last_logged_at: String,
    pub last_entry_id: String,
    /// Stable hash of the filter set that minted this cursor.
    pub query_hash: String,
}

pub fn encode_entry_cursor(payload: &EntryCursor, secret: &[u8]) -> Result<String, CursorError> {
    let payload_bytes = serde_json::to_vec(payload)
        .map_err(|e| CursorError::new(CursorErrorCode::InvalidPayload, e.to_string()))?;
    let payload_part = URL_SAFE_NO_PAD.encode(payload_bytes);
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| CursorError::new(CursorErrorCode::InvalidPayload, e.to_string()))?;
    mac.update(payload_part.as_bytes());
    let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{CURSOR_VERSION_V1}.{payload_part}.{sig_part}"))
}

pub fn decode_entry_cursor(
    token: &str,
    secret: &[u8],
    expected_hash: &str,
) -> Result<EntryCursor, CursorError> {
    if token.len() > MAX_CURSOR_TOKEN_LEN {
        return Err(CursorError::new(
            CursorErrorCode::InvalidFormat,
            "cursor exceeds max length",
        ));
    }
    let mut parts = token.splitn(3, '.');
    let version = parts.next().unwrap_or_default();
    let payload_part = parts.next().unwrap_or_default();
    let sig_part = parts.next().unwrap_or_default();
    if version != CURSOR_VERSION_V1 {
        return Err(CursorError::new(
            CursorErrorCode::UnsupportedVersion,
            format!("unsupported cursor version {version:?}"),
        ));
    }
    if payload_part.is_empty()
        || sig_part.is_empty()
        || payload_part.len() > MAX_PAYLOAD_PART_LEN
        || sig_part.len() > MAX_SIG_PART_LEN
    {
        return Err(CursorError::new(
            CursorErrorCode::InvalidFormat,
            "malformed cursor parts",
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| CursorError::new(CursorErrorCode::InvalidPayload, e.to_string()))?;
    mac.update(payload_part.as_bytes());
    let expected_sig = mac.finalize().into_bytes();
    let given_sig = URL_SAFE_NO_PAD
        .decode(sig_part)
        .map_err(|_| CursorError::new(CursorErrorCode::InvalidSignature, "bad signature encoding"))?;
    if !constant_time_eq(&expected_sig, &given_sig) {
        return Err(CursorError::new(
            CursorErrorCode::InvalidSignature,
            "cursor signature mismatch",
        ));
    }

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_part)
        .map_err(|_| CursorError::new(CursorErrorCode::InvalidPayload, "bad payload encoding"))?;
    let payload: EntryCursor = serde_json::from_slice(&payload_bytes)
        .map_err(|e| CursorError::new(CursorErrorCode::InvalidPayload, e.to_string()))?;

    if payload.order != ENTRY_ORDER {
        return Err(CursorError::new(
            CursorErrorCode::OrderMismatch,
            format!("cursor order {:?} does not match listing order", payload.order),
        ));
    }
    if payload.query_hash != expected_hash {
        return Err(CursorError::new(
            CursorErrorCode::QueryHashMismatch,
            "cursor was minted for a different filter set",
        ));
    }
    Ok(payload)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0_u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-cursor-secret";

    fn payload(hash: &str) -> EntryCursor {
        EntryCursor {
            order: ENTRY_ORDER.to_string(),
            last_logged_at: "2026-03-01T08:30:05.000000Z".to_string(),
            last_entry_id: "0c6f9ab2-9f55-4f7d-9e57-2a6a3c2f14d0".to_string(),
            query_hash: hash.to_string(),
        }
    }

    #[test]
    fn encode_decode_round_trips() {
        let original = payload("abc123");
        let token = encode_entry_cursor(&original, SECRET).expect("encode");
        assert!(token.starts_with("v1."));
        let decoded = decode_entry_cursor(&token, SECRET, "abc123").expect("decode");
        assert_eq!(decoded, original);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = encode_entry_cursor(&payload("abc123"), SECRET).expect("encode");
        let mut parts: Vec<&str> = token.split('.').collect();
        let altered = format!("{}x", parts[1]);
        parts[1] = &altered;
        let err = decode_entry_cursor(&parts.join("."), SECRET, "abc123").expect_err("tamper");
        assert_eq!(err.code, CursorErrorCode::InvalidSignature);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = encode_entry_cursor(&payload("abc123"), SECRET).expect("encode");
        let err = decode_entry_cursor(&token, b"other-secret", "abc123").expect_err("secret");
        assert_eq!(err.code, CursorErrorCode::InvalidSignature);
    }

    #[test]
    fn query_hash_binding_is_enforced() {
        let token = encode_entry_cursor(&payload("abc123"), SECRET).expect("encode");
        let err = decode_entry_cursor(&token, SECRET, "different").expect_err("hash");
        assert_eq!(err.code, CursorErrorCode::QueryHashMismatch);
    }

    #[test]
    fn garbage_tokens_fail_cleanly() {
        for bad in ["", "v1", "v2.a.b", "v1..", &"x".repeat(MAX_CURSOR_TOKEN_LEN + 1)] {
            assert!(decode_entry_cursor(bad, SECRET, "h").is_err(), "{bad:?}");
        }
    }
}
