// ============================
// crates/backend-lib/src/validation.rs
// ============================
//! Input validation for the auth and registry endpoints.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MAX_NAME_LENGTH: usize = 100;
const MAX_PATIENT_AGE: u32 = 120;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

/// Possible validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid age: {0}")]
    InvalidAge(String),

    #[error("Invalid contact number: {0}")]
    InvalidContactNumber(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate an email address
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(
            "Email must be between 1 and 254 characters".to_string(),
        ));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "Email format is invalid".to_string(),
        ));
    }

    Ok(email)
}

/// Validate a person name (user or patient)
pub fn validate_name(name: &str) -> ValidationResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidName(
            "Name must not be empty".to_string(),
        ));
    }

    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::InvalidName(format!(
            "Name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }

    Ok(name)
}

/// Validate a patient age
pub fn validate_age(age: u32) -> ValidationResult<u32> {
    if age == 0 || age > MAX_PATIENT_AGE {
        return Err(ValidationError::InvalidAge(format!(
            "Age must be between 1 and {MAX_PATIENT_AGE}"
        )));
    }

    Ok(age)
}

/// Validate a contact number: digits with optional separators
pub fn validate_contact_number(number: &str) -> ValidationResult<&str> {
    let digits = number.chars().filter(char::is_ascii_digit).count();
    if digits < 7 || digits > 15 {
        return Err(ValidationError::InvalidContactNumber(
            "Contact number must contain 7 to 15 digits".to_string(),
        ));
    }

    if !number
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')'))
    {
        return Err(ValidationError::InvalidContactNumber(
            "Contact number contains invalid characters".to_string(),
        ));
    }

    Ok(number)
}

/// Validate a monetary amount
pub fn validate_amount(amount: f64) -> ValidationResult<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ValidationError::InvalidAmount(
            "Amount must be a non-negative number".to_string(),
        ));
    }

    Ok(amount)
}
