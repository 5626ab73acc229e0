//! Bearer-token middleware.
//!
//! Validates the access token from the Authorization header and injects the
//! verified claims into request extensions for route handlers to consume.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::TokenService;

/// Guards routes that require an authenticated identity.
pub struct BearerAuth {
    tokens: TokenService,
}

impl BearerAuth {
    pub fn new(tokens: TokenService) -> Self {
        Self { tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(BearerAuthService {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
        }))
    }
}

pub struct BearerAuthService<S> {
    service: Rc<S>,
    tokens: TokenService,
}

impl<S, B> Service<ServiceRequest> for BearerAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let bearer = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer ").map(str::to_owned));

        let token = match bearer {
            Some(token) => token,
            None => {
                tracing::warn!("missing or non-bearer Authorization header");
                let response = HttpResponse::Unauthorized().json(serde_json::json!({
                    "code": "MISSING_TOKEN",
                    "message": "missing or invalid authorization header"
                }));
                return Box::pin(async move {
                    Err(actix_web::error::InternalError::from_response(
                        "Unauthorized",
                        response,
                    )
                    .into())
                });
            }
        };

        // Signature and expiry are verified before any claim is trusted; a
        // refresh or confirmation token presented here fails the purpose
        // check and is rejected like any other invalid token.
        match self.tokens.verify_access_claims(&token) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                tracing::warn!(error = %e, "access token rejected");
                let response = HttpResponse::Unauthorized().json(serde_json::json!({
                    "code": "TOKEN_INVALID",
                    "message": "invalid or expired token"
                }));
                Box::pin(async move {
                    Err(actix_web::error::InternalError::from_response(
                        "Unauthorized",
                        response,
                    )
                    .into())
                })
            }
        }
    }
}
