use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::validation::validate_max_len;
use crate::auth::{hash_password, tokens, AuthError};
use crate::database::models::UserSettings;
use crate::database::DatabaseError;
use crate::error::ApiError;

pub const PRO_ONLY_BRANDING: &str = "Branding colors and white-label are Pro-only.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingUpdate {
    pub company_name: Option<String>,
    pub company_url: Option<String>,
    pub logo_url: Option<String>,
    pub white_label_default: Option<bool>,
    pub brand_primary_color: Option<String>,
    pub brand_secondary_color: Option<String>,
}

impl BrandingUpdate {
    /// Fields only Pro accounts may set
    pub fn touches_pro_fields(&self) -> bool {
        self.white_label_default.is_some()
            || self.brand_primary_color.is_some()
            || self.brand_secondary_color.is_some()
    }

    pub fn validate(&self, is_pro: bool) -> Result<(), ApiError> {
        validate_max_len("companyName", self.company_name.as_deref(), 200)?;
        validate_max_len("companyUrl", self.company_url.as_deref(), 200)?;
        validate_max_len("logoUrl", self.logo_url.as_deref(), 400)?;
        validate_max_len("brandPrimaryColor", self.brand_primary_color.as_deref(), 20)?;
        validate_max_len("brandSecondaryColor", self.brand_secondary_color.as_deref(), 20)?;
        if !is_pro && self.touches_pro_fields() {
            return Err(ApiError::forbidden(PRO_ONLY_BRANDING));
        }
        Ok(())
    }
}

/// Field names match the stored settings row as `GET /api/settings` returns it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationUpdate {
    pub notification_audit_complete: Option<bool>,
    pub notification_weekly_digest: Option<bool>,
    pub notification_marketing: Option<bool>,
}

/// Returned once at creation; only the hash is kept
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedApiKey {
    pub api_key: String,
}

pub struct SettingsService {
    pool: PgPool,
}

impl SettingsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Option<UserSettings>, DatabaseError> {
        Ok(sqlx::query_as::<_, UserSettings>("SELECT * FROM settings WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Upsert; absent fields keep their stored value
    pub async fn update(
        &self,
        user_id: Uuid,
        branding: &BrandingUpdate,
        notifications: &NotificationUpdate,
    ) -> Result<UserSettings, DatabaseError> {
        let settings = sqlx::query_as::<_, UserSettings>(
            r#"
            INSERT INTO settings (
                id, user_id, company_name, company_url, logo_url, white_label_default,
                brand_primary_color, brand_secondary_color,
                notification_audit_complete, notification_weekly_digest, notification_marketing
            )
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, FALSE), $7, $8,
                    COALESCE($9, TRUE), COALESCE($10, FALSE), COALESCE($11, FALSE))
            ON CONFLICT (user_id) DO UPDATE SET
                company_name = COALESCE($3, settings.company_name),
                company_url = COALESCE($4, settings.company_url),
                logo_url = COALESCE($5, settings.logo_url),
                white_label_default = COALESCE($6, settings.white_label_default),
                brand_primary_color = COALESCE($7, settings.brand_primary_color),
                brand_secondary_color = COALESCE($8, settings.brand_secondary_color),
                notification_audit_complete = COALESCE($9, settings.notification_audit_complete),
                notification_weekly_digest = COALESCE($10, settings.notification_weekly_digest),
                notification_marketing = COALESCE($11, settings.notification_marketing),
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&branding.company_name)
        .bind(&branding.company_url)
        .bind(&branding.logo_url)
        .bind(branding.white_label_default)
        .bind(&branding.brand_primary_color)
        .bind(&branding.brand_secondary_color)
        .bind(notifications.notification_audit_complete)
        .bind(notifications.notification_weekly_digest)
        .bind(notifications.notification_marketing)
        .fetch_one(&self.pool)
        .await?;
        Ok(settings)
    }

    /// Replaces any previous key
    pub async fn rotate_api_key(&self, user_id: Uuid) -> Result<IssuedApiKey, AuthError> {
        let api_key = tokens::api_key();
        let hash = hash_password(&api_key).await?;

        sqlx::query(
            r#"
            INSERT INTO settings (id, user_id, api_key_hash, api_key_last4, api_key_created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                api_key_hash = EXCLUDED.api_key_hash,
                api_key_last4 = EXCLUDED.api_key_last4,
                api_key_created_at = EXCLUDED.api_key_created_at,
                updated_at = now()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(hash)
        .bind(tokens::last_four(&api_key))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::info!("Rotated API key for user {}", user_id);
        Ok(IssuedApiKey { api_key })
    }
}
