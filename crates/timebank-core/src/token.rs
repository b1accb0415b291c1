//! Opaque bearer tokens for sessions and invitations.
//!
//! Tokens are 32 random bytes, base64url without padding. Only the SHA-256
//! hash is ever persisted; the cleartext is shown once and then discarded.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

const TOKEN_LEN: usize = 32;

#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0_u8; TOKEN_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[must_use]
pub fn token_hash(token: &str) -> String {
    crate::sha256_hex(token.trim().as_bytes())
}
