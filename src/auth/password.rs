use tokio::task;

use super::AuthError;
use crate::config;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Hash with bcrypt on the blocking pool
pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    let cost = config::config().security.bcrypt_cost;
    hash_with_cost(password, cost).await
}

pub async fn hash_with_cost(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_owned();
    let hash = task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

/// Malformed stored hashes count as a mismatch rather than an error
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let verified = task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
    Ok(verified.unwrap_or(false))
}
