use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-user branding, notification and API key settings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: Option<String>,
    pub company_url: Option<String>,
    pub logo_url: Option<String>,
    pub white_label_default: bool,
    pub brand_primary_color: Option<String>,
    pub brand_secondary_color: Option<String>,
    pub notification_audit_complete: bool,
    pub notification_weekly_digest: bool,
    pub notification_marketing: bool,
    #[serde(skip_serializing, default)]
    pub api_key_hash: Option<String>,
    pub api_key_last4: Option<String>,
    pub api_key_created_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    pub allow_signup: bool,
    pub updated_at: DateTime<Utc>,
}
