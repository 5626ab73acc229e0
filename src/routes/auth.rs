//! Authentication routes.
//!
//! Thin translation layer: every handler runs the admission check, hands the
//! request to the identity gateway and maps the outcome onto a transport
//! response. Error kinds become status codes in `error.rs`.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthGateway, ConfirmationOutcome, ConfirmationRequest, RouteClass};
use crate::email_client::{dispatch_confirmation, EmailClient};
use crate::error::{AppError, AuthError, TokenError};
use crate::repository::users::{PgUserStore, User};
use crate::validators::{is_valid_email, is_valid_username};

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RequestEmailRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub user: UserResponse,
    pub detail: String,
}

/// Connection-level client key for anonymous routes.
fn connection_key(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}

/// Bearer token from the Authorization header.
fn bearer_token(req: &HttpRequest) -> Result<String, AppError> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer ").map(str::to_owned))
        .ok_or(AppError::Auth(AuthError::Token(TokenError::Malformed)))
}

/// POST /api/auth/signup
///
/// Creates the account and fires the confirmation mail in the background.
/// Strictly rate limited by connection key.
pub async fn signup(
    req: HttpRequest,
    form: web::Json<SignupRequest>,
    store: web::Data<PgUserStore>,
    gateway: web::Data<AuthGateway>,
    mailer: web::Data<EmailClient>,
) -> Result<HttpResponse, AppError> {
    gateway.admit(&connection_key(&req), RouteClass::Signup)?;

    let email = is_valid_email(&form.email)?;
    let username = is_valid_username(&form.username)?;

    let (user, confirmation_token) = gateway
        .signup(store.get_ref(), username, email, &form.password)
        .await?;

    dispatch_confirmation(
        mailer.get_ref().clone(),
        user.email.clone(),
        user.username.clone(),
        confirmation_token,
    );

    Ok(HttpResponse::Created().json(SignupResponse {
        user: UserResponse::from(&user),
        detail: "User successfully created. Check your email for confirmation.".to_string(),
    }))
}

/// POST /api/auth/login
///
/// Unknown email and wrong password are answered identically; an
/// unconfirmed account with the correct credential gets `Unconfirmed`.
pub async fn login(
    req: HttpRequest,
    form: web::Json<LoginRequest>,
    store: web::Data<PgUserStore>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    gateway.admit(&connection_key(&req), RouteClass::General)?;

    let email = is_valid_email(&form.email)?;
    let pair = gateway.login(store.get_ref(), &email, &form.password).await?;

    Ok(HttpResponse::Ok().json(pair))
}

/// GET /api/auth/refresh_token
///
/// Exchanges the bearer refresh token for a rotated pair. A stale token
/// clears the stored one and forces a full re-login.
pub async fn refresh_token(
    req: HttpRequest,
    store: web::Data<PgUserStore>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    gateway.admit(&connection_key(&req), RouteClass::General)?;

    let presented = bearer_token(&req)?;
    let pair = gateway.refresh(store.get_ref(), &presented).await?;

    Ok(HttpResponse::Ok().json(pair))
}

/// GET /api/auth/confirmed_email/{token}
///
/// Idempotent: a stale link clicked twice reports success both times.
pub async fn confirmed_email(
    path: web::Path<String>,
    store: web::Data<PgUserStore>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();

    let message = match gateway.confirm_email(store.get_ref(), &token).await? {
        ConfirmationOutcome::Confirmed => "Email confirmed",
        ConfirmationOutcome::AlreadyConfirmed => "Your email is already confirmed",
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": message })))
}

/// POST /api/auth/request_email
///
/// Re-sends the confirmation mail. The response does not reveal whether the
/// email belongs to an account.
pub async fn request_email(
    req: HttpRequest,
    form: web::Json<RequestEmailRequest>,
    store: web::Data<PgUserStore>,
    gateway: web::Data<AuthGateway>,
    mailer: web::Data<EmailClient>,
) -> Result<HttpResponse, AppError> {
    gateway.admit(&connection_key(&req), RouteClass::General)?;

    let email = is_valid_email(&form.email)?;
    if let ConfirmationRequest::Dispatch { user, token } =
        gateway.request_confirmation(store.get_ref(), &email).await?
    {
        dispatch_confirmation(
            mailer.get_ref().clone(),
            user.email.clone(),
            user.username.clone(),
            token,
        );
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Check your email for confirmation."
    })))
}
