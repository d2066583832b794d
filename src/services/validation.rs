//! Field checks shared by the request payloads.

use crate::error::ApiError;

/// Trimmed, lower-cased address or a 400
pub fn validate_email(field: &str, value: &str) -> Result<String, ApiError> {
    let email = value.trim().to_ascii_lowercase();
    if is_valid_email(&email) {
        Ok(email)
    } else {
        Err(ApiError::invalid_field(field, "must be a valid email address"))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

/// Character-count bounds, inclusive
pub fn validate_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min {
        return Err(ApiError::invalid_field(field, format!("must be at least {} characters", min)));
    }
    if len > max {
        return Err(ApiError::invalid_field(field, format!("must be at most {} characters", max)));
    }
    Ok(())
}

pub fn validate_max_len(field: &str, value: Option<&str>, max: usize) -> Result<(), ApiError> {
    match value {
        Some(v) => validate_len(field, v, 0, max),
        None => Ok(()),
    }
}

/// Trimmed name, with blank treated as absent
pub fn optional_name(field: &str, value: Option<&str>, min: usize, max: usize) -> Result<Option<String>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(name) => {
            validate_len(field, name, min, max)?;
            Ok(Some(name.to_string()))
        }
        None => Ok(None),
    }
}
