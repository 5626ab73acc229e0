//! Identity gateway: the externally visible surface of the auth core.
//!
//! Composes the credential hasher, token service and rate limiter over an
//! identity store to answer "is this request authenticated, and as whom".
//! The gateway has no transport vocabulary; the route layer translates its
//! error kinds into responses.

use std::time::Duration;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::rate_limit::{RateLimiter, RateQuota, RouteClass};
use crate::auth::service::TokenService;
use crate::configuration::RateLimitSettings;
use crate::error::{AppError, AuthError, TokenError, ValidationError};
use crate::repository::users::{NewUser, User, UserStore};

/// Access + refresh token pair handed out at login and on every rotation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl TokenPair {
    fn new(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Result of presenting a confirmation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Confirmed,
    /// The flag was already true; re-presenting a stale link is harmless.
    AlreadyConfirmed,
}

/// Result of asking for a (re-)send of the confirmation mail.
pub enum ConfirmationRequest {
    Dispatch { user: User, token: String },
    /// Already confirmed or unknown email; nothing to send. The two cases
    /// are logged distinctly but answered identically upstream.
    Noop,
}

pub struct AuthGateway {
    tokens: TokenService,
    limiter: RateLimiter,
    quotas: RateLimitSettings,
}

impl AuthGateway {
    pub fn new(tokens: TokenService, quotas: RateLimitSettings) -> Self {
        Self {
            tokens,
            limiter: RateLimiter::new(),
            quotas,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Admission check for one request. `key` is the caller's identity when
    /// authenticated, else a connection-level identifier.
    pub fn admit(&self, key: &str, class: RouteClass) -> Result<(), AppError> {
        let ceiling = match class {
            RouteClass::Signup => self.quotas.signup_ceiling,
            RouteClass::ContactCreate => self.quotas.contact_create_ceiling,
            RouteClass::General => self.quotas.general_ceiling,
        };
        let quota = RateQuota {
            ceiling,
            window: Duration::from_secs(self.quotas.window_secs),
        };
        self.limiter.check(key, class, quota)
    }

    /// Register a new identity. Returns the created user together with a
    /// confirmation token for the caller to dispatch by mail.
    pub async fn signup(
        &self,
        store: &dyn UserStore,
        username: String,
        email: String,
        password: &str,
    ) -> Result<(User, String), AppError> {
        if store.find_by_email(&email).await?.is_some() {
            return Err(AppError::Auth(AuthError::Conflict));
        }

        let password_hash = hash_password(password)?;
        // A concurrent signup for the same email loses on the unique
        // constraint and surfaces as the same Conflict.
        let user = store
            .create(NewUser {
                username,
                email,
                password_hash,
            })
            .await?;

        let confirmation_token = self.tokens.issue_confirmation(&user.email)?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok((user, confirmation_token))
    }

    /// Verify credentials and hand out a token pair. The new refresh token
    /// becomes the identity's sole live value.
    pub async fn login(
        &self,
        store: &dyn UserStore,
        email: &str,
        password: &str,
    ) -> Result<TokenPair, AppError> {
        let user = match store.find_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::warn!("login attempt for unknown email");
                return Err(AppError::Auth(AuthError::InvalidCredential));
            }
        };

        if !verify_password(password, &user.password_hash) {
            tracing::warn!(user_id = %user.id, "login attempt with wrong password");
            return Err(AppError::Auth(AuthError::InvalidCredential));
        }

        // Only after the credential checks out: Unconfirmed means "correct
        // credential, email not confirmed".
        if !user.confirmed {
            return Err(AppError::Auth(AuthError::Unconfirmed));
        }

        let access_token = self.tokens.issue_access(&user.email)?;
        let refresh_token = self.tokens.issue_refresh(&user.email)?;
        store
            .set_refresh_token(&user.email, Some(&refresh_token))
            .await?;

        tracing::info!(user_id = %user.id, "user logged in");
        Ok(TokenPair::new(access_token, refresh_token))
    }

    /// Rotation protocol: verify the presented refresh token, compare it
    /// byte-for-byte against the identity's stored one, and swap in a fresh
    /// pair. Any mismatch, including a validly signed but already-rotated
    /// token, clears the stored token and fails with `RefreshReuseDetected`.
    pub async fn refresh(
        &self,
        store: &dyn UserStore,
        presented: &str,
    ) -> Result<TokenPair, AppError> {
        let email = self.tokens.verify_refresh(presented)?;

        let replacement = self.tokens.issue_refresh(&email)?;
        store
            .rotate_refresh_token(&email, presented, &replacement)
            .await?;

        let access_token = self.tokens.issue_access(&email)?;
        tracing::info!("refresh token rotated");
        Ok(TokenPair::new(access_token, replacement))
    }

    /// Flip the identity's confirmed flag. Idempotent: a stale link clicked
    /// twice reports `AlreadyConfirmed` without error.
    pub async fn confirm_email(
        &self,
        store: &dyn UserStore,
        token: &str,
    ) -> Result<ConfirmationOutcome, AppError> {
        let email = self.tokens.verify_confirmation(token)?;

        let user = store.find_by_email(&email).await?.ok_or_else(|| {
            tracing::warn!("confirmation token for unknown account");
            AppError::Validation(ValidationError::InvalidFormat(
                "verification error".to_string(),
            ))
        })?;

        if user.confirmed {
            return Ok(ConfirmationOutcome::AlreadyConfirmed);
        }

        store.set_confirmed(&email).await?;
        tracing::info!(user_id = %user.id, "email confirmed");
        Ok(ConfirmationOutcome::Confirmed)
    }

    /// Prepare a confirmation-mail (re-)send. Unknown emails and
    /// already-confirmed accounts both come back as `Noop` so the route can
    /// answer identically in every case.
    pub async fn request_confirmation(
        &self,
        store: &dyn UserStore,
        email: &str,
    ) -> Result<ConfirmationRequest, AppError> {
        let user = match store.find_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::warn!("confirmation requested for unknown email");
                return Ok(ConfirmationRequest::Noop);
            }
        };

        if user.confirmed {
            tracing::info!(user_id = %user.id, "confirmation requested for confirmed account");
            return Ok(ConfirmationRequest::Noop);
        }

        let token = self.tokens.issue_confirmation(&user.email)?;
        Ok(ConfirmationRequest::Dispatch { user, token })
    }

    /// Verify a bearer access token and return the authenticated identity's
    /// email.
    pub fn authenticate(&self, token: &str) -> Result<String, TokenError> {
        self.tokens.verify_access(token)
    }
}
