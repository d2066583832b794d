// handlers/public/auth/register.rs - POST /auth/register handler

use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::password::{MAX_PASSWORD_LEN, MIN_PASSWORD_LEN};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Payload};
use crate::services::accounts::Registration;
use crate::services::validation::{optional_name, validate_email, validate_len};
use crate::services::AccountService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: String,
    pub password: String,
    pub invite_token: Option<String>,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, ApiError> {
        let name = optional_name("name", self.name.as_deref(), 2, 120)?;
        let email = validate_email("email", &self.email)?;
        validate_len("password", &self.password, MIN_PASSWORD_LEN, MAX_PASSWORD_LEN)?;

        let invite_token = match self.invite_token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => {
                validate_len("inviteToken", token, 8, 256)?;
                Some(token.to_string())
            }
            None => None,
        };

        Ok(Registration {
            name,
            email,
            password: self.password,
            invite_token,
        })
    }
}

/// POST /auth/register - create an account, optionally redeeming an invite
///
/// Returns `{id, email}`. The client signs in separately.
pub async fn register_post(Payload(body): Payload<RegisterRequest>) -> ApiResult<Value> {
    let registration = body.validate()?;

    let pool = DatabaseManager::pool().await?;
    let user = AccountService::new(pool).register(registration).await?;

    Ok(ApiResponse::created(json!({ "id": user.id, "email": user.email })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: None,
            email: email.to_string(),
            password: password.to_string(),
            invite_token: None,
        }
    }

    #[test]
    fn normalizes_email_and_drops_blank_invite() {
        let mut body = request("  New.User@Example.COM ", "correct-horse");
        body.invite_token = Some("   ".to_string());
        let registration = body.validate().unwrap();
        assert_eq!(registration.email, "new.user@example.com");
        assert!(registration.invite_token.is_none());
    }

    #[test]
    fn rejects_short_password_and_token() {
        assert_eq!(request("a@b.co", "short").validate().unwrap_err().status_code(), 400);

        let mut body = request("a@b.co", "long-enough");
        body.invite_token = Some("abc".to_string());
        assert_eq!(body.validate().unwrap_err().status_code(), 400);
    }

    #[test]
    fn rejects_one_letter_name() {
        let mut body = request("a@b.co", "long-enough");
        body.name = Some("A".to_string());
        assert!(body.validate().is_err());
    }
}
