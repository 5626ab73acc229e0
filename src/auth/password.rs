//! Credential hashing and verification.
//!
//! bcrypt (salted, deliberately slow) is the only way a password ever meets
//! storage: plaintext is hashed at signup and compared one-way at login,
//! never logged or returned.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash a password with bcrypt.
///
/// Salting makes every call produce a different encoding; all of them verify
/// against the original plaintext.
///
/// # Errors
/// Returns an error if the password fails strength validation or hashing
/// itself fails.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_strength(password)?;

    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a password against its stored hash.
///
/// Never fails toward the caller: a malformed or corrupted hash verifies as
/// `false`, exactly like a mismatch.
pub fn verify_password(password: &str, hashed: &str) -> bool {
    verify(password, hashed).unwrap_or(false)
}

/// Password strength requirements: 8-128 characters with at least one digit,
/// one lowercase and one uppercase letter. The upper bound is a bcrypt
/// limitation as much as a DoS guard.
fn validate_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password",
            MIN_PASSWORD_LENGTH,
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password",
            MAX_PASSWORD_LENGTH,
        )));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_against_original() {
        let password = "CorrectHorse1";
        let hashed = hash_password(password).expect("hash");

        assert_ne!(password, hashed);
        assert!(verify_password(password, &hashed));
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let hashed = hash_password("CorrectHorse1").expect("hash");
        assert!(!verify_password("WrongHorse1", &hashed));
    }

    #[test]
    fn two_hashes_of_same_password_differ_but_both_verify() {
        let password = "CorrectHorse1";
        let h1 = hash_password(password).expect("hash");
        let h2 = hash_password(password).expect("hash");

        assert_ne!(h1, h2);
        assert!(verify_password(password, &h1));
        assert!(verify_password(password, &h2));
    }

    #[test]
    fn malformed_hash_reports_false_not_error() {
        assert!(!verify_password("CorrectHorse1", "not-a-bcrypt-hash"));
        assert!(!verify_password("CorrectHorse1", ""));
    }

    #[test]
    fn weak_passwords_are_rejected() {
        assert!(hash_password("Short1").is_err());
        assert!(hash_password("nouppercase1").is_err());
        assert!(hash_password("NOLOWERCASE1").is_err());
        assert!(hash_password("NoDigitsHere").is_err());

        let too_long = format!("Aa1{}", "x".repeat(MAX_PASSWORD_LENGTH));
        assert!(hash_password(&too_long).is_err());
    }
}
