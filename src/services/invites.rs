use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::tokens;
use crate::database::models::InviteToken;
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::types::Role;

pub const DEFAULT_EXPIRY_DAYS: i64 = 7;
pub const MAX_EXPIRY_DAYS: i64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InviteError {
    #[error("Invalid invite token.")]
    Invalid,

    #[error("Invite already used.")]
    AlreadyUsed,

    #[error("Invite has expired.")]
    Expired,

    #[error("Invite email mismatch.")]
    EmailMismatch,
}

impl InviteError {
    pub fn reason(&self) -> &'static str {
        match self {
            InviteError::Invalid => "invalid",
            InviteError::AlreadyUsed => "used",
            InviteError::Expired => "expired",
            InviteError::EmailMismatch => "email_mismatch",
        }
    }
}

impl From<InviteError> for ApiError {
    fn from(err: InviteError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

/// Whether `invite` can be redeemed for `email` at `now`.
/// Checks run in the order used, expired, email so the message names the first problem.
pub fn check_redeemable(invite: &InviteToken, email: Option<&str>, now: DateTime<Utc>) -> Result<(), InviteError> {
    if invite.used_at.is_some() {
        return Err(InviteError::AlreadyUsed);
    }
    if invite.expires_at < now {
        return Err(InviteError::Expired);
    }
    if let (Some(restricted), Some(email)) = (invite.email.as_deref(), email) {
        if !restricted.trim().eq_ignore_ascii_case(email.trim()) {
            return Err(InviteError::EmailMismatch);
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewInvite {
    pub email: Option<String>,
    pub is_pro: bool,
    pub role: Role,
    pub expires_in_days: i64,
}

/// What the sign-up page needs to know about a token before submitting
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitePreview {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_pro: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl InvitePreview {
    fn rejected(reason: &'static str) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            email: None,
            role: None,
            is_pro: None,
            expires_at: None,
        }
    }
}

pub struct InviteService {
    pool: PgPool,
}

impl InviteService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, invite: NewInvite, created_by: Option<Uuid>) -> Result<InviteToken, DatabaseError> {
        let expires_at = Utc::now() + Duration::days(invite.expires_in_days);
        let row = sqlx::query_as::<_, InviteToken>(
            r#"
            INSERT INTO invite_tokens (id, token, email, is_pro, role, expires_at, created_by_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tokens::invite_token())
        .bind(invite.email)
        .bind(invite.is_pro)
        .bind(invite.role)
        .bind(expires_at)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Created invite {} (role {:?}, pro {})", row.id, row.role, row.is_pro);
        Ok(row)
    }

    pub async fn list(&self, limit: i64) -> Result<Vec<InviteToken>, DatabaseError> {
        Ok(sqlx::query_as::<_, InviteToken>(
            "SELECT * FROM invite_tokens ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn find(&self, token: &str) -> Result<Option<InviteToken>, DatabaseError> {
        Ok(sqlx::query_as::<_, InviteToken>("SELECT * FROM invite_tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn preview(&self, token: &str) -> Result<InvitePreview, DatabaseError> {
        let Some(invite) = self.find(token).await? else {
            return Ok(InvitePreview::rejected(InviteError::Invalid.reason()));
        };
        if let Err(err) = check_redeemable(&invite, None, Utc::now()) {
            return Ok(InvitePreview::rejected(err.reason()));
        }
        Ok(InvitePreview {
            valid: true,
            reason: None,
            email: invite.email,
            role: Some(invite.role),
            is_pro: Some(invite.is_pro),
            expires_at: Some(invite.expires_at),
        })
    }
}

/// Marks the invite used inside the registration transaction.
/// The `used_at IS NULL` guard makes a concurrent second redemption fail.
pub async fn redeem(
    tx: &mut Transaction<'_, Postgres>,
    invite_id: Uuid,
    user_id: Uuid,
) -> Result<(), RedeemError> {
    let result = sqlx::query(
        r#"
        UPDATE invite_tokens
        SET used_at = now(), used_by_id = $2
        WHERE id = $1 AND used_at IS NULL AND expires_at > now()
        "#,
    )
    .bind(invite_id)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RedeemError::Invite(InviteError::AlreadyUsed));
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum RedeemError {
    #[error(transparent)]
    Invite(#[from] InviteError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite(email: Option<&str>) -> InviteToken {
        InviteToken {
            id: Uuid::new_v4(),
            token: tokens::invite_token(),
            email: email.map(str::to_string),
            is_pro: true,
            role: Role::User,
            expires_at: Utc::now() + Duration::days(7),
            used_at: None,
            used_by_id: None,
            created_by_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn fresh_invite_is_redeemable() {
        assert!(check_redeemable(&invite(None), Some("anyone@example.com"), Utc::now()).is_ok());
    }

    #[test]
    fn used_invite_is_rejected() {
        let mut used = invite(None);
        used.used_at = Some(Utc::now());
        assert_eq!(check_redeemable(&used, None, Utc::now()), Err(InviteError::AlreadyUsed));
    }

    #[test]
    fn expired_invite_is_rejected() {
        let stale = invite(None);
        let later = stale.expires_at + Duration::seconds(1);
        assert_eq!(check_redeemable(&stale, None, later), Err(InviteError::Expired));
    }

    #[test]
    fn restricted_invite_compares_email_case_insensitively() {
        let restricted = invite(Some("Client@Example.com"));
        assert!(check_redeemable(&restricted, Some("client@example.com"), Utc::now()).is_ok());
        assert_eq!(
            check_redeemable(&restricted, Some("someone@else.com"), Utc::now()),
            Err(InviteError::EmailMismatch)
        );
    }

    #[test]
    fn invite_errors_are_bad_requests() {
        let err: ApiError = InviteError::Expired.into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Invite has expired.");
    }
}
