use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

/// Centralized validation for registration and administrative input.
/// Lazy-loaded email validation regex
///
/// Validates a practical subset of RFC 5322. Loaded once and reused.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex pattern")
});

/// Mobile numbers are accepted in E.164-ish form: optional `+`, 7-15 digits.
static MOBILE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("Invalid mobile regex pattern"));

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingField(
            "Email is required".to_string(),
        ));
    }

    if email.len() > 254 {
        return Err(ValidationError::InvalidEmail(
            "Email is too long".to_string(),
        ));
    }

    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(format!(
            "Invalid email format: {email}"
        )))
    }
}

/// Validates a password against minimum strength requirements.
///
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - Cannot be empty or whitespace only
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingField(
            "Password is required".to_string(),
        ));
    }

    if password.trim().is_empty() {
        return Err(ValidationError::InvalidPassword(
            "Password cannot be only whitespace".to_string(),
        ));
    }

    if password.len() < 8 {
        return Err(ValidationError::InvalidPassword(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(ValidationError::InvalidPassword(
            "Password must be no more than 128 characters long".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_mobile(mobile: &str) -> Result<(), ValidationError> {
    if mobile.is_empty() {
        return Err(ValidationError::MissingField(
            "Mobile number is required".to_string(),
        ));
    }

    if MOBILE_REGEX.is_match(mobile) {
        Ok(())
    } else {
        Err(ValidationError::InvalidMobile(format!(
            "Invalid mobile number: {mobile}"
        )))
    }
}

pub fn validate_full_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingField(
            "Full name is required".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(ValidationError::InvalidField(
            "Full name is too long".to_string(),
        ));
    }

    Ok(())
}
