use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::invites::{self, check_redeemable, InviteError, InviteService, RedeemError};
use crate::auth::{hash_password, tokens, verify_password, AuthError};
use crate::database::models::{SystemSettings, User, UserSummary};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::types::{Role, UserStatus};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    EmailTaken(&'static str),

    #[error("Signups are currently disabled.")]
    SignupsDisabled,

    #[error(transparent)]
    Invite(#[from] InviteError),

    #[error("User not found.")]
    UserNotFound,

    #[error("No changes provided.")]
    NoChanges,

    #[error("Current password required.")]
    CurrentPasswordRequired,

    #[error("Current password is incorrect.")]
    CurrentPasswordIncorrect,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for AccountError {
    fn from(err: sqlx::Error) -> Self {
        AccountError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<RedeemError> for AccountError {
    fn from(err: RedeemError) -> Self {
        match err {
            RedeemError::Invite(e) => AccountError::Invite(e),
            RedeemError::Sqlx(e) => e.into(),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::EmailTaken(msg) => ApiError::conflict(msg),
            AccountError::SignupsDisabled => ApiError::forbidden(err.to_string()),
            AccountError::Invite(e) => e.into(),
            AccountError::UserNotFound => ApiError::not_found(err.to_string()),
            AccountError::NoChanges | AccountError::CurrentPasswordRequired => ApiError::bad_request(err.to_string()),
            AccountError::CurrentPasswordIncorrect => ApiError::forbidden(err.to_string()),
            AccountError::Auth(e) => e.into(),
            AccountError::Database(e) => e.into(),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: Option<String>,
    pub email: String,
    pub password: String,
    pub invite_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub password: Option<String>,
    pub role: Role,
    pub is_pro: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub is_pro: Option<bool>,
    pub password: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.role.is_none()
            && self.status.is_none()
            && self.is_pro.is_none()
            && self.password.is_none()
    }
}

/// Identity returned by an OAuth provider
#[derive(Debug, Clone)]
pub struct OAuthIdentity {
    pub provider: &'static str,
    pub provider_account_id: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Why an OAuth sign-in was refused; `code` goes into the `?error=` redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OAuthDenied {
    #[error("The provider did not share an email address")]
    MissingEmail,
    #[error("Account is disabled")]
    Disabled,
    #[error("Email is registered without this provider")]
    NotLinked,
    #[error("Signups are currently disabled")]
    SignupsDisabled,
}

impl OAuthDenied {
    pub fn code(self) -> &'static str {
        match self {
            OAuthDenied::NotLinked => "OAuthAccountNotLinked",
            _ => "AccessDenied",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthDecision {
    /// Already linked to this user
    SignIn(Uuid),
    /// New email: create the user and the account link
    Create,
}

/// Sign-in rules for a provider identity, given what the database already holds
pub fn decide_oauth(
    email: Option<&str>,
    linked: Option<&User>,
    by_email: Option<&User>,
    allow_signup: bool,
) -> Result<OAuthDecision, OAuthDenied> {
    if email.map(str::trim).unwrap_or_default().is_empty() {
        return Err(OAuthDenied::MissingEmail);
    }
    if let Some(user) = linked {
        if user.is_disabled() {
            return Err(OAuthDenied::Disabled);
        }
        return Ok(OAuthDecision::SignIn(user.id));
    }
    if let Some(user) = by_email {
        if user.is_disabled() {
            return Err(OAuthDenied::Disabled);
        }
        return Err(OAuthDenied::NotLinked);
    }
    if !allow_signup {
        return Err(OAuthDenied::SignupsDisabled);
    }
    Ok(OAuthDecision::Create)
}

#[derive(Debug)]
pub enum SeedOutcome {
    Created(User),
    AlreadyExists,
}

pub struct AccountService {
    pool: PgPool,
}

impl AccountService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// The singleton settings row, created with defaults when missing
    pub async fn system_settings(&self) -> Result<SystemSettings, DatabaseError> {
        sqlx::query("INSERT INTO system_settings (id) VALUES (1) ON CONFLICT (id) DO NOTHING")
            .execute(&self.pool)
            .await?;
        Ok(sqlx::query_as::<_, SystemSettings>(
            "SELECT allow_signup, updated_at FROM system_settings WHERE id = 1",
        )
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn set_allow_signup(&self, allow_signup: bool) -> Result<SystemSettings, DatabaseError> {
        let settings = sqlx::query_as::<_, SystemSettings>(
            r#"
            INSERT INTO system_settings (id, allow_signup, updated_at) VALUES (1, $1, now())
            ON CONFLICT (id) DO UPDATE SET allow_signup = EXCLUDED.allow_signup, updated_at = now()
            RETURNING allow_signup, updated_at
            "#,
        )
        .bind(allow_signup)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!("Signups {}", if allow_signup { "enabled" } else { "disabled" });
        Ok(settings)
    }

    /// Self-service sign-up, optionally through an invite
    pub async fn register(&self, registration: Registration) -> Result<User, AccountError> {
        if self.find_by_email(&registration.email).await?.is_some() {
            return Err(AccountError::EmailTaken("Email already in use."));
        }

        let settings = self.system_settings().await?;

        let invite = match registration.invite_token.as_deref() {
            Some(token) => {
                let invite = InviteService::new(self.pool.clone())
                    .find(token)
                    .await?
                    .ok_or(InviteError::Invalid)?;
                check_redeemable(&invite, Some(&registration.email), Utc::now())?;
                Some(invite)
            }
            None => None,
        };

        if invite.is_none() && !settings.allow_signup {
            return Err(AccountError::SignupsDisabled);
        }

        let (role, is_pro) = invite
            .as_ref()
            .map(|i| (i.role, i.is_pro))
            .unwrap_or((Role::User, false));
        let password_hash = hash_password(&registration.password).await?;

        let mut tx = self.pool.begin().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, is_pro)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&registration.name)
        .bind(&registration.email)
        .bind(&password_hash)
        .bind(role)
        .bind(is_pro)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AccountError::EmailTaken("Email already in use.")
            } else {
                e.into()
            }
        })?;

        if let Some(invite) = &invite {
            invites::redeem(&mut tx, invite.id, user.id).await?;
        }
        tx.commit().await?;

        tracing::info!(
            "Registered user {} ({}){}",
            user.id,
            user.email,
            if invite.is_some() { " via invite" } else { "" }
        );
        Ok(user)
    }

    /// Credential sign-in. Every failure is `None` so callers cannot tell which check failed.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, AccountError> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(None);
        };
        let Some(hash) = user.password_hash.as_deref() else {
            return Ok(None);
        };
        if user.is_disabled() {
            tracing::warn!("Sign-in refused for disabled user {}", user.id);
            return Ok(None);
        }
        if !verify_password(password, hash).await? {
            return Ok(None);
        }
        Ok(Some(user))
    }

    pub async fn list_users(&self) -> Result<Vec<UserSummary>, DatabaseError> {
        Ok(sqlx::query_as::<_, UserSummary>(
            "SELECT id, name, email, role, status, is_pro, created_at FROM users ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    /// Admin-created user. Returns the temporary password when none was supplied.
    pub async fn create_user(&self, new_user: NewUser) -> Result<(User, Option<String>), AccountError> {
        if self.find_by_email(&new_user.email).await?.is_some() {
            return Err(AccountError::EmailTaken("Email already exists."));
        }

        let temp_password = match new_user.password {
            Some(_) => None,
            None => Some(tokens::temporary_password()),
        };
        let password = new_user
            .password
            .as_deref()
            .or(temp_password.as_deref())
            .unwrap_or_default();
        let password_hash = hash_password(password).await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, is_pro)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&password_hash)
        .bind(new_user.role)
        .bind(new_user.is_pro)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AccountError::EmailTaken("Email already exists.")
            } else {
                e.into()
            }
        })?;

        tracing::info!("Admin created user {} with role {:?}", user.id, user.role);
        Ok((user, temp_password))
    }

    pub async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<User, AccountError> {
        if patch.is_empty() {
            return Err(AccountError::NoChanges);
        }

        let password_hash = match patch.password.as_deref() {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                role = COALESCE($3, role),
                status = COALESCE($4, status),
                is_pro = COALESCE($5, is_pro),
                password_hash = COALESCE($6, password_hash),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(patch.role)
        .bind(patch.status)
        .bind(patch.is_pro)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AccountError::UserNotFound)?;

        tracing::info!("Admin updated user {}", user.id);
        Ok(user)
    }

    pub async fn update_name(&self, id: Uuid, name: &str) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET name = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Users with a password must prove it; OAuth-only users may set one freely
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: Option<&str>,
        new_password: &str,
    ) -> Result<(), AccountError> {
        let user = self.find_by_id(user_id).await?.ok_or(AccountError::UserNotFound)?;

        if let Some(hash) = user.password_hash.as_deref() {
            let current = current_password
                .filter(|p| !p.is_empty())
                .ok_or(AccountError::CurrentPasswordRequired)?;
            if !verify_password(current, hash).await? {
                tracing::warn!("Password change refused for user {}: wrong current password", user_id);
                return Err(AccountError::CurrentPasswordIncorrect);
            }
        }

        let new_hash = hash_password(new_password).await?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(new_hash)
            .execute(&self.pool)
            .await?;

        tracing::info!("Password changed for user {}", user_id);
        Ok(())
    }

    /// Resolve a provider identity to a user, creating one when signups allow it
    pub async fn oauth_sign_in(&self, identity: &OAuthIdentity) -> Result<Result<User, OAuthDenied>, AccountError> {
        let email = identity.email.as_deref().map(|e| e.trim().to_ascii_lowercase());

        let linked = sqlx::query_as::<_, User>(
            r#"
            SELECT u.* FROM accounts a
            JOIN users u ON u.id = a.user_id
            WHERE a.provider = $1 AND a.provider_account_id = $2
            "#,
        )
        .bind(identity.provider)
        .bind(&identity.provider_account_id)
        .fetch_optional(&self.pool)
        .await?;

        let by_email = match (&linked, email.as_deref()) {
            (None, Some(email)) => self.find_by_email(email).await?,
            _ => None,
        };
        let allow_signup = self.system_settings().await?.allow_signup;

        let decision = match decide_oauth(email.as_deref(), linked.as_ref(), by_email.as_ref(), allow_signup) {
            Ok(decision) => decision,
            Err(denied) => return Ok(Err(denied)),
        };

        match (decision, linked) {
            (OAuthDecision::SignIn(_), Some(user)) => Ok(Ok(user)),
            _ => {
                let mut tx = self.pool.begin().await?;
                let user = sqlx::query_as::<_, User>(
                    r#"
                    INSERT INTO users (id, name, email, email_verified, image)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING *
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(&identity.name)
                .bind(email.as_deref().unwrap_or_default())
                .bind(identity.email_verified.then(Utc::now))
                .bind(&identity.image)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query(
                    "INSERT INTO accounts (id, user_id, provider, provider_account_id) VALUES ($1, $2, $3, $4)",
                )
                .bind(Uuid::new_v4())
                .bind(user.id)
                .bind(identity.provider)
                .bind(&identity.provider_account_id)
                .execute(&mut *tx)
                .await?;
                tx.commit().await?;

                tracing::info!("Created user {} from {} sign-in", user.id, identity.provider);
                Ok(Ok(user))
            }
        }
    }

    /// Idempotent bootstrap of the first super-admin
    pub async fn seed_super_admin(&self, email: &str, password: &str) -> Result<SeedOutcome, AccountError> {
        if self.find_by_email(email).await?.is_some() {
            return Ok(SeedOutcome::AlreadyExists);
        }
        let (user, _) = self
            .create_user(NewUser {
                name: Some("Super Admin".to_string()),
                email: email.to_string(),
                password: Some(password.to_string()),
                role: Role::SuperAdmin,
                is_pro: true,
            })
            .await?;
        Ok(SeedOutcome::Created(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(status: UserStatus) -> User {
        User {
            id: Uuid::new_v4(),
            name: None,
            email: "person@example.com".to_string(),
            email_verified: None,
            image: None,
            password_hash: None,
            role: Role::User,
            status,
            is_pro: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn oauth_requires_an_email() {
        assert_eq!(decide_oauth(None, None, None, true), Err(OAuthDenied::MissingEmail));
        assert_eq!(decide_oauth(Some("  "), None, None, true), Err(OAuthDenied::MissingEmail));
    }

    #[test]
    fn linked_account_signs_in_unless_disabled() {
        let active = user(UserStatus::Active);
        assert_eq!(
            decide_oauth(Some("person@example.com"), Some(&active), None, false),
            Ok(OAuthDecision::SignIn(active.id))
        );
        let disabled = user(UserStatus::Disabled);
        assert_eq!(
            decide_oauth(Some("person@example.com"), Some(&disabled), None, true),
            Err(OAuthDenied::Disabled)
        );
    }

    #[test]
    fn unlinked_existing_email_is_not_taken_over() {
        let existing = user(UserStatus::Active);
        let denied = decide_oauth(Some("person@example.com"), None, Some(&existing), true).unwrap_err();
        assert_eq!(denied, OAuthDenied::NotLinked);
        assert_eq!(denied.code(), "OAuthAccountNotLinked");
    }

    #[test]
    fn new_email_respects_signup_switch() {
        assert_eq!(decide_oauth(Some("new@example.com"), None, None, true), Ok(OAuthDecision::Create));
        let denied = decide_oauth(Some("new@example.com"), None, None, false).unwrap_err();
        assert_eq!(denied, OAuthDenied::SignupsDisabled);
        assert_eq!(denied.code(), "AccessDenied");
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(UserPatch::default().is_empty());
        let patch = UserPatch {
            is_pro: Some(true),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn account_errors_map_to_statuses() {
        let conflict: ApiError = AccountError::EmailTaken("Email already in use.").into();
        assert_eq!(conflict.status_code(), 409);
        let disabled: ApiError = AccountError::SignupsDisabled.into();
        assert_eq!(disabled.status_code(), 403);
        let wrong: ApiError = AccountError::CurrentPasswordIncorrect.into();
        assert_eq!(wrong.status_code(), 403);
        let missing: ApiError = AccountError::CurrentPasswordRequired.into();
        assert_eq!(missing.status_code(), 400);
        let empty: ApiError = AccountError::NoChanges.into();
        assert_eq!(empty.message(), "No changes provided.");
    }
}
