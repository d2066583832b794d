//! Credentials, sessions and sign-in plumbing.
//!
//! A signed-in client holds a single opaque string (cookie or bearer token).
//! Under the database strategy it is a random token whose sha256 is stored in
//! `sessions`; under the JWT strategy it is an HS256 token. Either way every
//! request resolves it back to the current `users` row, so role, plan and
//! status changes propagate once the session cache entry lapses.

pub mod cache;
pub mod cookies;
pub mod oauth;
pub mod password;
pub mod session;
pub mod tokens;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::database::models::User;
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::types::{Role, UserStatus};

pub use cache::{SessionCache, SESSION_CACHE};
pub use password::{hash_password, verify_password};
pub use session::{IssuedSession, SessionStore, SessionUser};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Database(db) => db.into(),
            AuthError::Jwt(e) => {
                tracing::debug!("Rejected session token: {}", e);
                ApiError::unauthorized("Unauthorized.")
            }
            other => {
                tracing::error!("Auth failure: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

/// Claims carried by a JWT session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub is_pro: bool,
    pub status: UserStatus,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn for_user(user: &User) -> Self {
        let now = Utc::now();
        let ttl_hours = config::config().security.session_ttl_hours;
        let exp = (now + Duration::hours(ttl_hours as i64)).timestamp();

        Self {
            sub: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            is_pro: user.is_pro,
            status: user.status,
            exp,
            iat: now.timestamp(),
        }
    }
}

pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    let secret = &config::config().security.jwt_secret;
    encode_with_secret(claims, secret)
}

pub fn validate_jwt(token: &str) -> Result<Claims, AuthError> {
    let secret = &config::config().security.jwt_secret;
    decode_with_secret(token, secret)
}

fn encode_with_secret(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    Ok(encode(&Header::default(), claims, &encoding_key)?)
}

fn decode_with_secret(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4(),
            email: "owner@example.com".to_string(),
            name: Some("Owner".to_string()),
            role: Role::SuperAdmin,
            is_pro: true,
            status: UserStatus::Active,
            exp: now + exp_offset,
            iat: now,
        }
    }

    #[test]
    fn jwt_round_trip_keeps_role_and_plan() {
        let original = claims(3600);
        let token = encode_with_secret(&original, "test-secret").unwrap();
        let decoded = decode_with_secret(&token, "test-secret").unwrap();
        assert_eq!(decoded.sub, original.sub);
        assert_eq!(decoded.role, Role::SuperAdmin);
        assert!(decoded.is_pro);
    }

    #[test]
    fn jwt_rejects_wrong_secret_and_expired_tokens() {
        let token = encode_with_secret(&claims(3600), "test-secret").unwrap();
        assert!(matches!(decode_with_secret(&token, "other"), Err(AuthError::Jwt(_))));

        let expired = encode_with_secret(&claims(-3600), "test-secret").unwrap();
        assert!(matches!(decode_with_secret(&expired, "test-secret"), Err(AuthError::Jwt(_))));
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(encode_with_secret(&claims(60), ""), Err(AuthError::MissingSecret)));
    }
}
