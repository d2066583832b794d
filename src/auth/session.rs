use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{cache::SESSION_CACHE, tokens, validate_jwt, generate_jwt, AuthError, Claims};
use crate::config::{self, SessionStrategy};
use crate::database::models::User;
use crate::types::{Role, UserStatus};

/// Token handed back to the client after a successful sign-in
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires: DateTime<Utc>,
}

impl IssuedSession {
    pub fn max_age_secs(&self) -> i64 {
        (self.expires - Utc::now()).num_seconds().max(0)
    }
}

/// What the client sees of its own session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Role,
    pub is_pro: bool,
    pub status: UserStatus,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
            role: user.role,
            is_pro: user.is_pro,
            status: user.status,
        }
    }
}

#[derive(FromRow)]
struct ActiveSession {
    #[sqlx(flatten)]
    user: User,
    session_expires: DateTime<Utc>,
}

/// Issues, resolves and revokes sessions under the configured strategy.
pub struct SessionStore {
    pool: PgPool,
    strategy: SessionStrategy,
}

impl SessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self::with_strategy(pool, config::config().security.session_strategy)
    }

    pub fn with_strategy(pool: PgPool, strategy: SessionStrategy) -> Self {
        Self { pool, strategy }
    }

    pub async fn issue(&self, user: &User) -> Result<IssuedSession, AuthError> {
        let ttl_hours = config::config().security.session_ttl_hours as i64;

        match self.strategy {
            SessionStrategy::Database => {
                let token = tokens::session_token();
                let expires = Utc::now() + Duration::hours(ttl_hours);
                sqlx::query(
                    "INSERT INTO sessions (id, token_hash, user_id, expires) VALUES ($1, $2, $3, $4)",
                )
                .bind(Uuid::new_v4())
                .bind(tokens::sha256_hex(&token))
                .bind(user.id)
                .bind(expires)
                .execute(&self.pool)
                .await?;

                tracing::info!("Issued database session for user {}", user.id);
                Ok(IssuedSession { token, expires })
            }
            SessionStrategy::Jwt => {
                let claims = Claims::for_user(user);
                let expires = DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
                let token = generate_jwt(&claims)?;

                tracing::info!("Issued JWT session for user {}", user.id);
                Ok(IssuedSession { token, expires })
            }
        }
    }

    /// Current user behind `token`, or `None` when the session is unknown or expired
    pub async fn resolve(&self, token: &str) -> Result<Option<User>, AuthError> {
        let key = tokens::sha256_hex(token);
        if let Some(user) = SESSION_CACHE.get(&key).await {
            return Ok(Some(user));
        }

        let resolved = match self.strategy {
            SessionStrategy::Database => {
                sqlx::query_as::<_, ActiveSession>(
                    r#"
                    SELECT u.*, s.expires AS session_expires
                    FROM sessions s
                    JOIN users u ON u.id = s.user_id
                    WHERE s.token_hash = $1 AND s.expires > now()
                    "#,
                )
                .bind(&key)
                .fetch_optional(&self.pool)
                .await?
                .map(|row| (row.user, row.session_expires))
            }
            SessionStrategy::Jwt => {
                let claims = match validate_jwt(token) {
                    Ok(claims) => claims,
                    Err(AuthError::Jwt(e)) => {
                        tracing::debug!("Rejected JWT: {}", e);
                        return Ok(None);
                    }
                    Err(other) => return Err(other),
                };
                let expires = DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
                sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                    .bind(claims.sub)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(|user| (user, expires))
            }
        };

        Ok(match resolved {
            Some((user, expires)) => {
                SESSION_CACHE.insert(key, user.clone(), expires).await;
                Some(user)
            }
            None => None,
        })
    }

    /// Sign-out. A JWT cannot be recalled, so only the cache entry goes.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let key = tokens::sha256_hex(token);
        if self.strategy == SessionStrategy::Database {
            sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
                .bind(&key)
                .execute(&self.pool)
                .await?;
        }
        SESSION_CACHE.evict(&key).await;
        Ok(())
    }

    /// Drop every session of `user_id` except `keep` (the caller's own token)
    pub async fn revoke_user(&self, user_id: Uuid, keep: Option<&str>) -> Result<(), AuthError> {
        if self.strategy == SessionStrategy::Database {
            let keep_hash = keep.map(tokens::sha256_hex);
            sqlx::query(
                "DELETE FROM sessions WHERE user_id = $1 AND ($2::text IS NULL OR token_hash <> $2)",
            )
            .bind(user_id)
            .bind(keep_hash)
            .execute(&self.pool)
            .await?;
        }
        SESSION_CACHE.evict_user(user_id).await;
        Ok(())
    }

    pub async fn delete_expired(&self) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires <= now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
