// SPDX-License-Identifier: Apache-2.0

//! Password hashing for interactive login.
//!
//! PBKDF2-HMAC-SHA256 with a per-password random salt, encoded as
//! `pbkdf2-sha256$iterations$salt$digest` (base64url, no padding). Verification
//! recomputes the digest and compares in constant time.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

pub const SCHEME: &str = "pbkdf2-sha256";
pub const DEFAULT_ITERATIONS: u32 = 600_000;
pub const MIN_ITERATIONS: u32 = 1_000;
pub const MAX_PASSWORD_LEN: usize = 1_024;
const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialError(pub String);

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CredentialError {}

pub fn hash_password(password: &str, iterations: u32) -> Result<String, CredentialError> {
    if password.is_empty() {
        return Err(CredentialError("password must not be empty".to_string()));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(CredentialError(format!(
            "password exceeds {MAX_PASSWORD_LEN} bytes"
        )));
    }
    if iterations < MIN_ITERATIONS {
        return Err(CredentialError(format!(
            "iterations below floor of {MIN_ITERATIONS}"
        )));
    }

    let mut salt = [0_u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = derive(password.as_bytes(), &salt, iterations)?;

    Ok(format!(
        "{SCHEME}${iterations}${}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(digest)
    ))
}

pub fn verify_password(password: &str, encoded: &str) -> Result<bool, CredentialError> {
    let mut parts = encoded.split('$');
    let scheme = parts.next().unwrap_or_default();
    if scheme != SCHEME {
        return Err(CredentialError(format!(
            "unsupported password scheme: {scheme}"
        )));
    }
    let iterations: u32 = parts
        .next()
        .unwrap_or_default()
        .parse()
        .map_err(|_| CredentialError("invalid iteration count".to_string()))?;
    if iterations < MIN_ITERATIONS {
        return Err(CredentialError("iteration count below floor".to_string()));
    }
    let salt = URL_SAFE_NO_PAD
        .decode(parts.next().unwrap_or_default())
        .map_err(|e| CredentialError(format!("salt decode failed: {e}")))?;
    let expected = URL_SAFE_NO_PAD
        .decode(parts.next().unwrap_or_default())
        .map_err(|e| CredentialError(format!("digest decode failed: {e}")))?;
    if parts.next().is_some() || expected.len() != DIGEST_LEN {
        return Err(CredentialError("malformed password record".to_string()));
    }
    if password.is_empty() || password.len() > MAX_PASSWORD_LEN {
        return Ok(false);
    }

    let actual = derive(password.as_bytes(), &salt, iterations)?;
    Ok(constant_time_eq(&actual, &expected))
}

// PBKDF2 with a 32-byte output needs exactly one block.
fn derive(password: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; DIGEST_LEN], CredentialError> {
    let mut mac =
        HmacSha256::new_from_slice(password).map_err(|e| CredentialError(e.to_string()))?;
    mac.update(salt);
    mac.update(&1_u32.to_be_bytes());
    let mut round: [u8; DIGEST_LEN] = mac.finalize().into_bytes().into();
    let mut out = round;

    for _ in 1..iterations {
        let mut mac =
            HmacSha256::new_from_slice(password).map_err(|e| CredentialError(e.to_string()))?;
        mac.update(&round);
        round = mac.finalize().into_bytes().into();
        for (acc, byte) in out.iter_mut().zip(round.iter()) {
            *acc ^= *byte;
        }
    }
    Ok(out)
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
