//! Claim set carried by every token issued by this service.
//!
//! Besides the standard iat/exp pair (RFC 7519), each token carries a
//! `scope` purpose tag so that a token of one kind can never be accepted
//! where another is required.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Purpose tag distinguishing the three token kinds.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    /// Short-lived, authenticates a single request. Never stored.
    Access,
    /// Long-lived, exchanged for a new pair. Exactly one live value per
    /// identity at a time.
    Refresh,
    /// Proves control of an email address. Conceptually single-use.
    Confirmation,
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenScope::Access => write!(f, "access"),
            TokenScope::Refresh => write!(f, "refresh"),
            TokenScope::Confirmation => write!(f, "confirmation"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject: the identity's email address.
    pub sub: String,
    /// Purpose tag.
    pub scope: TokenScope,
    /// Token id. Makes two tokens issued within the same second distinct,
    /// which rotation's byte-for-byte comparison relies on.
    pub jti: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

impl Claims {
    pub fn new(email: impl Into<String>, scope: TokenScope, ttl_secs: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: email.into(),
            scope,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + ttl_secs,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp < chrono::Utc::now().timestamp()
    }
}
