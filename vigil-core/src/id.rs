//! ID generation utilities with prefix support
//!
//! Identifiers are generated with at least 96 bits of entropy and are
//! URL-safe: `{prefix}_{base64url}`.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

/// Generate a prefixed ID with 96 bits of entropy.
///
/// # Arguments
/// * `prefix` - The prefix for the ID (e.g., "acct", "dev", "evt")
pub fn generate_prefixed_id(prefix: &str) -> String {
    let mut bytes = [0u8; 12];
    OsRng.try_fill_bytes(&mut bytes).unwrap();

    let encoded = BASE64_URL_SAFE_NO_PAD.encode(bytes);

    format!("{prefix}_{encoded}")
}

/// Validate that a prefixed ID has the expected format.
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    if !id.starts_with(&format!("{expected_prefix}_")) {
        return false;
    }

    let random_part = &id[expected_prefix.len() + 1..];

    match BASE64_URL_SAFE_NO_PAD.decode(random_part) {
        Ok(decoded) => decoded.len() >= 12,
        Err(_) => false,
    }
}

/// Generate a URL-safe random string from `length` bytes of entropy.
/// Used for opaque session tokens.
pub fn generate_random_string(length: usize) -> String {
    if length < 32 {
        panic!("Length must be at least 32");
    }
    let mut bytes = vec![0u8; length];
    OsRng.try_fill_bytes(&mut bytes).unwrap();
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}
