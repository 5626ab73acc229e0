//! Token service: issuance and verification of the three token kinds.
//!
//! Stateless over the codec; nothing here touches storage. The purpose tag
//! baked into every claim set is re-checked on verification, so a token of
//! one kind presented where another is required fails with `WrongPurpose`
//! even though its signature is valid.

use crate::auth::claims::{Claims, TokenScope};
use crate::auth::jwt::TokenCodec;
use crate::configuration::AuthSettings;
use crate::error::{AppError, TokenError};

#[derive(Clone)]
pub struct TokenService {
    codec: TokenCodec,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    confirmation_ttl_secs: i64,
}

impl TokenService {
    pub fn new(settings: &AuthSettings) -> Result<Self, AppError> {
        Ok(Self {
            codec: TokenCodec::new(settings)?,
            access_ttl_secs: settings.access_token_ttl_secs,
            refresh_ttl_secs: settings.refresh_token_ttl_secs,
            confirmation_ttl_secs: settings.confirmation_token_ttl_secs,
        })
    }

    /// Issue a short-lived access token for an identity.
    pub fn issue_access(&self, email: &str) -> Result<String, AppError> {
        self.issue(email, TokenScope::Access, self.access_ttl_secs)
    }

    /// Issue a long-lived refresh token. The caller is responsible for
    /// persisting it as the identity's sole live value.
    pub fn issue_refresh(&self, email: &str) -> Result<String, AppError> {
        self.issue(email, TokenScope::Refresh, self.refresh_ttl_secs)
    }

    /// Issue an email-confirmation token.
    pub fn issue_confirmation(&self, email: &str) -> Result<String, AppError> {
        self.issue(email, TokenScope::Confirmation, self.confirmation_ttl_secs)
    }

    /// Verify an access token and return the subject email.
    pub fn verify_access(&self, token: &str) -> Result<String, TokenError> {
        self.verify_access_claims(token).map(|claims| claims.sub)
    }

    /// Verify an access token and return the full claim set, for callers
    /// that inject the claims into request context.
    pub fn verify_access_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.codec.decode(token)?;
        if claims.scope != TokenScope::Access {
            return Err(TokenError::WrongPurpose {
                expected: TokenScope::Access,
                found: claims.scope,
            });
        }
        Ok(claims)
    }

    /// Verify a refresh token and return the subject email.
    pub fn verify_refresh(&self, token: &str) -> Result<String, TokenError> {
        self.verify(token, TokenScope::Refresh)
    }

    /// Verify a confirmation token and return the subject email.
    pub fn verify_confirmation(&self, token: &str) -> Result<String, TokenError> {
        self.verify(token, TokenScope::Confirmation)
    }

    fn issue(&self, email: &str, scope: TokenScope, ttl_secs: i64) -> Result<String, AppError> {
        let claims = Claims::new(email, scope, ttl_secs);
        self.codec.encode(&claims)
    }

    fn verify(&self, token: &str, expected: TokenScope) -> Result<String, TokenError> {
        let claims = self.codec.decode(token)?;
        if claims.scope != expected {
            return Err(TokenError::WrongPurpose {
                expected,
                found: claims.scope,
            });
        }
        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> TokenService {
        TokenService::new(&AuthSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            algorithm: "HS256".to_string(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 604800,
            confirmation_token_ttl_secs: 259200,
        })
        .expect("token service")
    }

    #[test]
    fn each_kind_verifies_as_itself() {
        let service = test_service();

        let access = service.issue_access("a@x.com").expect("issue");
        let refresh = service.issue_refresh("a@x.com").expect("issue");
        let confirmation = service.issue_confirmation("a@x.com").expect("issue");

        assert_eq!(service.verify_access(&access).unwrap(), "a@x.com");
        assert_eq!(service.verify_refresh(&refresh).unwrap(), "a@x.com");
        assert_eq!(service.verify_confirmation(&confirmation).unwrap(), "a@x.com");
    }

    #[test]
    fn access_token_is_rejected_as_refresh() {
        let service = test_service();
        let access = service.issue_access("a@x.com").expect("issue");

        assert_eq!(
            service.verify_refresh(&access),
            Err(TokenError::WrongPurpose {
                expected: TokenScope::Refresh,
                found: TokenScope::Access,
            })
        );
    }

    #[test]
    fn refresh_token_is_rejected_as_access() {
        let service = test_service();
        let refresh = service.issue_refresh("a@x.com").expect("issue");

        assert!(matches!(
            service.verify_access(&refresh),
            Err(TokenError::WrongPurpose { .. })
        ));
    }

    #[test]
    fn confirmation_token_is_not_an_access_token() {
        let service = test_service();
        let confirmation = service.issue_confirmation("a@x.com").expect("issue");

        assert!(matches!(
            service.verify_access(&confirmation),
            Err(TokenError::WrongPurpose { .. })
        ));
    }
}
