//! Input validation for the request payloads this service accepts.
//!
//! Length limits double as a DoS guard; format checks keep junk out of the
//! store before a query ever runs.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MIN_USERNAME_LENGTH: usize = 5;
const MAX_USERNAME_LENGTH: usize = 16;
const MAX_NAME_LENGTH: usize = 50;
const MAX_INFO_LENGTH: usize = 350;

lazy_static! {
    // RFC 5322 simplified (practical validation).
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    // E.164-ish: optional +, optional country 1, 9-15 digits.
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?1?\d{9,15}$").unwrap();
}

pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email"));
    }
    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email", MIN_EMAIL_LENGTH));
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH));
    }
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat(
            "email has invalid format".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username"));
    }
    if trimmed.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort("username", MIN_USERNAME_LENGTH));
    }
    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong("username", MAX_USERNAME_LENGTH));
    }
    if has_suspicious_characters(trimmed) {
        return Err(ValidationError::InvalidFormat(
            "username contains invalid characters".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

/// Contact first/last name.
pub fn is_valid_name(name: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong(field, MAX_NAME_LENGTH));
    }
    if has_suspicious_characters(trimmed) {
        return Err(ValidationError::InvalidFormat(format!(
            "{} contains invalid characters",
            field
        )));
    }

    Ok(trimmed.to_string())
}

pub fn is_valid_phone(phone: &str) -> Result<String, ValidationError> {
    let trimmed = phone.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("phone_number"));
    }
    if !PHONE_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat(
            "phone_number has invalid format".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

pub fn is_valid_info(info: &str) -> Result<String, ValidationError> {
    if info.len() > MAX_INFO_LENGTH {
        return Err(ValidationError::TooLong("info", MAX_INFO_LENGTH));
    }
    if has_suspicious_characters(info) {
        return Err(ValidationError::InvalidFormat(
            "info contains invalid characters".to_string(),
        ));
    }

    Ok(info.to_string())
}

/// Null bytes and control characters have no business in any of these
/// fields.
fn has_suspicious_characters(input: &str) -> bool {
    input.chars().any(|c| c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_emails_pass() {
        assert!(is_valid_email("user@example.com").is_ok());
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn invalid_emails_fail() {
        assert!(is_valid_email("notanemail").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
        assert!(is_valid_email("").is_err());

        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());
    }

    #[test]
    fn email_is_trimmed() {
        assert_eq!(is_valid_email("  user@example.com ").unwrap(), "user@example.com");
    }

    #[test]
    fn username_length_is_enforced() {
        assert!(is_valid_username("deadpool").is_ok());
        assert!(is_valid_username("abcd").is_err()); // too short
        assert!(is_valid_username(&"a".repeat(17)).is_err());
    }

    #[test]
    fn names_reject_control_characters() {
        assert!(is_valid_name("Jean-Pierre", "first_name").is_ok());
        assert!(is_valid_name("O'Brien", "last_name").is_ok());
        assert!(is_valid_name("bad\0name", "first_name").is_err());
        assert!(is_valid_name("", "first_name").is_err());
    }

    #[test]
    fn phone_patterns() {
        assert!(is_valid_phone("+12025550123").is_ok());
        assert!(is_valid_phone("2025550123").is_ok());
        assert!(is_valid_phone("12345").is_err());
        assert!(is_valid_phone("phone-number").is_err());
    }

    #[test]
    fn info_length_limit() {
        assert!(is_valid_info(&"x".repeat(350)).is_ok());
        assert!(is_valid_info(&"x".repeat(351)).is_err());
    }
}
