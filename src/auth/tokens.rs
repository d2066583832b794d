// Random secrets handed to clients: session tokens, invite tokens, API keys
// and temporary passwords.
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const API_KEY_PREFIX: &str = "cseo_";

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

pub fn random_hex(len: usize) -> String {
    hex::encode(random_bytes(len))
}

pub fn random_base64url(len: usize) -> String {
    URL_SAFE_NO_PAD.encode(random_bytes(len))
}

/// 64 hex chars
pub fn session_token() -> String {
    random_hex(32)
}

/// 64 hex chars
pub fn invite_token() -> String {
    random_hex(32)
}

/// Shown once to the admin who created the user
pub fn temporary_password() -> String {
    format!("{}{}", random_base64url(6), random_hex(2))
}

pub fn api_key() -> String {
    format!("{}{}", API_KEY_PREFIX, random_base64url(24))
}

pub fn last_four(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    chars[chars.len().saturating_sub(4)..].iter().collect()
}

/// Stored in place of the raw token so a leaked table cannot be replayed
pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}
