//! User routes (authenticated).

use actix_web::{web, HttpResponse};

use crate::auth::{AuthGateway, Claims, RouteClass};
use crate::error::{AppError, AuthError};
use crate::repository::users::{PgUserStore, User, UserStore};
use crate::routes::auth::UserResponse;

/// Resolve the authenticated identity behind the verified claims. A token
/// whose subject no longer exists is rejected like any bad credential.
pub async fn current_user(store: &PgUserStore, claims: &Claims) -> Result<User, AppError> {
    store
        .find_by_email(&claims.sub)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidCredential))
}

/// GET /api/users/me
pub async fn me(
    claims: web::ReqData<Claims>,
    store: web::Data<PgUserStore>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    gateway.admit(&claims.sub, RouteClass::General)?;

    let user = current_user(store.get_ref(), &claims).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}
