//! Token codec: signs and verifies the compact, self-contained tokens this
//! service hands out.
//!
//! The signing secret and algorithm are process-wide configuration, parsed
//! once when the codec is built. Decoding verifies the signature before any
//! claim is deserialized; an unverified payload is never inspected.

use std::str::FromStr;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::AuthSettings;
use crate::error::{AppError, TokenError};

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
}

impl TokenCodec {
    /// Build a codec from the configured secret and algorithm identifier.
    ///
    /// # Errors
    /// Returns an error if the algorithm identifier is not a known JWT
    /// algorithm name.
    pub fn new(settings: &AuthSettings) -> Result<Self, AppError> {
        let algorithm = Algorithm::from_str(&settings.algorithm).map_err(|e| {
            AppError::Internal(format!(
                "unknown signing algorithm {:?}: {}",
                settings.algorithm, e
            ))
        })?;

        // The expiry boundary is exact: a token is valid one second before
        // its exp and rejected once exp has passed.
        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            header: Header::new(algorithm),
            validation,
        })
    }

    /// Encode a claim set into a signed, expiring token.
    pub fn encode(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&self.header, claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("token encoding failed: {}", e)))
    }

    /// Verify and decode a token.
    ///
    /// # Errors
    /// `InvalidSignature` if the signature does not match the shared secret,
    /// `Expired` if the embedded expiry has passed, `Malformed` if the token
    /// cannot be parsed at all.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature
                | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::TokenScope;

    fn test_settings() -> AuthSettings {
        AuthSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            algorithm: "HS256".to_string(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 604800,
            confirmation_token_ttl_secs: 259200,
        }
    }

    #[test]
    fn round_trip_preserves_claims() {
        let codec = TokenCodec::new(&test_settings()).expect("codec");
        let claims = Claims::new("a@x.com", TokenScope::Access, 900);

        let token = codec.encode(&claims).expect("encode");
        let decoded = codec.decode(&token).expect("decode");

        assert_eq!(decoded, claims);
    }

    #[test]
    fn tokens_are_bearer_safe() {
        let codec = TokenCodec::new(&test_settings()).expect("codec");
        let claims = Claims::new("a@x.com", TokenScope::Refresh, 900);
        let token = codec.encode(&claims).expect("encode");

        assert!(token.is_ascii());
        assert!(!token.contains(char::is_whitespace));
    }

    #[test]
    fn tampered_payload_fails_signature_check() {
        let codec = TokenCodec::new(&test_settings()).expect("codec");
        let original = codec
            .encode(&Claims::new("a@x.com", TokenScope::Access, 900))
            .expect("encode");
        let other = codec
            .encode(&Claims::new("b@x.com", TokenScope::Access, 900))
            .expect("encode");

        // Well-formed token whose payload was swapped in from another one.
        let parts: Vec<&str> = original.split('.').collect();
        let other_payload = other.split('.').nth(1).expect("payload");
        let spliced = format!("{}.{}.{}", parts[0], other_payload, parts[2]);

        assert_eq!(codec.decode(&spliced), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn foreign_secret_fails_signature_check() {
        let codec = TokenCodec::new(&test_settings()).expect("codec");
        let mut other_settings = test_settings();
        other_settings.secret = "a-completely-different-secret-of-some-length".to_string();
        let other = TokenCodec::new(&other_settings).expect("codec");

        let token = other
            .encode(&Claims::new("a@x.com", TokenScope::Access, 900))
            .expect("encode");
        assert_eq!(codec.decode(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn expired_token_fails_with_expired() {
        let codec = TokenCodec::new(&test_settings()).expect("codec");
        let claims = Claims::new("a@x.com", TokenScope::Access, -5);

        let token = codec.encode(&claims).expect("encode");
        assert_eq!(codec.decode(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_one_second_before_expiry_is_valid() {
        let codec = TokenCodec::new(&test_settings()).expect("codec");
        let claims = Claims::new("a@x.com", TokenScope::Access, 1);

        let token = codec.encode(&claims).expect("encode");
        assert!(codec.decode(&token).is_ok());
    }

    #[test]
    fn garbage_fails_as_malformed() {
        let codec = TokenCodec::new(&test_settings()).expect("codec");
        assert_eq!(codec.decode("not.a.token"), Err(TokenError::Malformed));
        assert_eq!(codec.decode(""), Err(TokenError::Malformed));
    }

    #[test]
    fn unknown_algorithm_is_rejected_at_build() {
        let mut settings = test_settings();
        settings.algorithm = "ROT13".to_string();
        assert!(TokenCodec::new(&settings).is_err());
    }
}
