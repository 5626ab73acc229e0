//! Unified error handling for the service.
//!
//! Domain-specific error types (token verification, authentication,
//! validation, storage, mail) are unified under `AppError`, which carries the
//! actix `ResponseError` implementation so that route handlers can translate
//! any failure into a transport response with `?`.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use crate::auth::claims::TokenScope;

/// Token verification failures, each distinguishable so callers can give
/// precise feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token could not be parsed at all.
    Malformed,
    /// The signature does not match the shared secret.
    InvalidSignature,
    /// Current time exceeds the embedded expiry.
    Expired,
    /// A token of one kind was presented where another is required.
    WrongPurpose {
        expected: TokenScope,
        found: TokenScope,
    },
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "token is malformed"),
            TokenError::InvalidSignature => write!(f, "token signature is invalid"),
            TokenError::Expired => write!(f, "token has expired"),
            TokenError::WrongPurpose { expected, found } => {
                write!(f, "expected a {} token, got a {} token", expected, found)
            }
        }
    }
}

impl StdError for TokenError {}

/// Authentication and admission failures surfaced by the identity gateway.
#[derive(Debug)]
pub enum AuthError {
    /// Unknown email or password mismatch. Deliberately indistinguishable at
    /// the boundary to prevent account enumeration; the two cases are logged
    /// distinctly where they arise.
    InvalidCredential,
    /// Correct credential, email not yet confirmed.
    Unconfirmed,
    Token(TokenError),
    /// A valid-looking refresh token that is not the identity's current one.
    /// Always accompanied by clearing the stored refresh token.
    RefreshReuseDetected,
    /// Admission ceiling hit for the current window.
    RateExceeded { retry_after: Duration },
    /// Signup against an already-registered email.
    Conflict,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredential => write!(f, "invalid email or password"),
            AuthError::Unconfirmed => write!(f, "email not confirmed"),
            AuthError::Token(e) => write!(f, "{}", e),
            AuthError::RefreshReuseDetected => write!(f, "refresh token reuse detected"),
            AuthError::RateExceeded { retry_after } => {
                write!(f, "rate limit exceeded, retry in {}s", retry_after.as_secs())
            }
            AuthError::Conflict => write!(f, "account already exists"),
        }
    }
}

impl StdError for AuthError {}

/// Validation errors for input data.
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooShort(&'static str, usize),
    TooLong(&'static str, usize),
    InvalidFormat(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(msg) => write!(f, "{}", msg),
        }
    }
}

impl StdError for ValidationError {}

/// Database operation errors.
#[derive(Debug)]
pub enum DatabaseError {
    NotFound(String),
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::NotFound(msg) => write!(f, "not found: {}", msg),
            DatabaseError::QueryExecution(msg) => write!(f, "query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Mail dispatch errors. Never surfaced to the request that triggered the
/// send; only logged by the dispatching task.
#[derive(Debug, Clone)]
pub enum EmailError {
    SendFailed(String),
    ServiceUnavailable(String),
}

impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailError::SendFailed(msg) => write!(f, "failed to send email: {}", msg),
            EmailError::ServiceUnavailable(msg) => {
                write!(f, "email service unavailable: {}", msg)
            }
        }
    }
}

impl StdError for EmailError {}

/// Central error type that all application errors map to.
#[derive(Debug)]
pub enum AppError {
    Auth(AuthError),
    Validation(ValidationError),
    Database(DatabaseError),
    Email(EmailError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Email(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::Auth(AuthError::Token(err))
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        AppError::Email(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => {
                AppError::Database(DatabaseError::NotFound("record not found".to_string()))
            }
            sqlx::Error::Database(db_err) => {
                // 23505 = unique_violation; the only unique constraint this
                // service owns is the users.email one.
                if db_err.code().as_deref() == Some("23505") {
                    AppError::Auth(AuthError::Conflict)
                } else {
                    AppError::Database(DatabaseError::QueryExecution(db_err.to_string()))
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                AppError::Database(DatabaseError::ConnectionPool(err.to_string()))
            }
            _ => AppError::Database(DatabaseError::UnexpectedError(err.to_string())),
        }
    }
}

/// Error body returned to clients.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Auth(AuthError::InvalidCredential) => "INVALID_CREDENTIAL",
            AppError::Auth(AuthError::Unconfirmed) => "EMAIL_NOT_CONFIRMED",
            AppError::Auth(AuthError::Token(TokenError::Malformed)) => "TOKEN_MALFORMED",
            AppError::Auth(AuthError::Token(TokenError::InvalidSignature)) => "TOKEN_INVALID",
            AppError::Auth(AuthError::Token(TokenError::Expired)) => "TOKEN_EXPIRED",
            AppError::Auth(AuthError::Token(TokenError::WrongPurpose { .. })) => {
                "TOKEN_WRONG_PURPOSE"
            }
            AppError::Auth(AuthError::RefreshReuseDetected) => "REFRESH_REUSE_DETECTED",
            AppError::Auth(AuthError::RateExceeded { .. }) => "RATE_EXCEEDED",
            AppError::Auth(AuthError::Conflict) => "ACCOUNT_EXISTS",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Database(DatabaseError::NotFound(_)) => "NOT_FOUND",
            AppError::Database(DatabaseError::ConnectionPool(_)) => "SERVICE_UNAVAILABLE",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Email(_) => "EMAIL_SERVICE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::Auth(AuthError::RefreshReuseDetected) => {
                tracing::warn!(error = %self, "refresh token reuse detected");
            }
            AppError::Auth(AuthError::RateExceeded { retry_after }) => {
                tracing::warn!(retry_after_secs = retry_after.as_secs(), "request rate limited");
            }
            AppError::Auth(e) => {
                tracing::warn!(error = %e, "authentication failure");
            }
            AppError::Validation(e) => {
                tracing::warn!(error = %e, "validation failure");
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "database failure");
            }
            AppError::Email(e) => {
                tracing::error!(error = %e, "email dispatch failure");
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::Conflict) => StatusCode::CONFLICT,
            AppError::Auth(AuthError::RateExceeded { .. }) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(DatabaseError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Database(DatabaseError::ConnectionPool(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Email(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.log();

        let retry_after = match self {
            AppError::Auth(AuthError::RateExceeded { retry_after }) => Some(*retry_after),
            _ => None,
        };

        // Internal details never leave the process.
        let message = match self {
            AppError::Database(DatabaseError::NotFound(_)) => "not found".to_string(),
            AppError::Database(_) => "storage error".to_string(),
            AppError::Email(_) => "email service temporarily unavailable".to_string(),
            AppError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            code: self.code().to_string(),
            message,
            retry_after_secs: retry_after.map(|d| d.as_secs()),
        };

        let mut builder = HttpResponse::build(self.status_code());
        if let Some(d) = retry_after {
            builder.insert_header(("Retry-After", d.as_secs().to_string()));
        }
        builder.json(body)
    }
}
