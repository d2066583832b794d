// HTTP-facing error type. Every failure leaves the API as
// `{"success": false, "error": <message>, "code": <CODE>}`.
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::DatabaseError;

/// Client-safe error. The variant picks status and code, the string is shown verbatim.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// 400 carrying per-field detail in `fieldErrors`
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    /// Body could not be parsed at all
    InvalidJson(String),
    Unauthorized(String),
    /// Plan limits, closed signup, Pro-only settings, non-admin callers
    Forbidden(String),
    /// Also used for rows owned by someone else
    NotFound(String),
    Conflict(String),
    /// Audit cooldown and concurrency cap
    TooManyRequests(String),
    InternalServerError(String),
    ServiceUnavailable(String),
}

impl ApiError {
    fn kind(&self) -> (StatusCode, &'static str, &str) {
        match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", m),
            ApiError::ValidationError { message, .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message),
            ApiError::InvalidJson(m) => (StatusCode::BAD_REQUEST, "INVALID_JSON", m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", m),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, "FORBIDDEN", m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "NOT_FOUND", m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, "CONFLICT", m),
            ApiError::TooManyRequests(m) => (StatusCode::TOO_MANY_REQUESTS, "TOO_MANY_REQUESTS", m),
            ApiError::InternalServerError(m) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", m),
            ApiError::ServiceUnavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", m),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind().0
    }

    pub fn status_code(&self) -> u16 {
        self.status().as_u16()
    }

    pub fn error_code(&self) -> &'static str {
        self.kind().1
    }

    pub fn message(&self) -> &str {
        self.kind().2
    }

    pub fn to_json(&self) -> Value {
        let (_, code, message) = self.kind();
        let mut body = json!({ "success": false, "error": message, "code": code });
        if let ApiError::ValidationError { field_errors: Some(fields), .. } = self {
            body["fieldErrors"] = json!(fields);
        }
        body
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    /// Single-field validation failure. The message stays generic so clients
    /// can rely on it, the field detail rides along in `fieldErrors`.
    pub fn invalid_field(field: &str, problem: impl Into<String>) -> Self {
        ApiError::ValidationError {
            message: "Invalid payload.".to_string(),
            field_errors: Some(HashMap::from([(field.to_string(), problem.into())])),
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

const DB_UNAVAILABLE: &str = "Database temporarily unavailable";

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Sqlx(e) => e.into(),
            DatabaseError::Migration(detail) => {
                tracing::error!("Migration error: {}", detail);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            unconfigured => {
                tracing::error!("Database not configured: {}", unconfigured);
                ApiError::service_unavailable(DB_UNAVAILABLE)
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::not_found("Not found."),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                tracing::error!("Database connectivity error: {}", err);
                ApiError::service_unavailable(DB_UNAVAILABLE)
            }
            other => {
                tracing::error!("Query failed: {}", other);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_uses_failure_envelope() {
        let body = ApiError::conflict("Email already in use.").to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Email already in use.");
        assert_eq!(body["code"], "CONFLICT");
    }

    #[test]
    fn invalid_field_reports_field_detail() {
        let err = ApiError::invalid_field("email", "must be a valid email address");
        assert_eq!(err.status_code(), 400);
        let body = err.to_json();
        assert_eq!(body["error"], "Invalid payload.");
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["fieldErrors"]["email"], "must be a valid email address");
    }

    #[test]
    fn throttling_is_429() {
        let err = ApiError::too_many_requests("Please wait a minute before starting another audit.");
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.error_code(), "TOO_MANY_REQUESTS");
    }

    #[test]
    fn missing_database_maps_to_503() {
        let err: ApiError = DatabaseError::ConfigMissing("DATABASE_URL").into();
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.message(), DB_UNAVAILABLE);
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), 404);
    }
}
