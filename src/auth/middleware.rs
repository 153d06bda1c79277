use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::token::verify_token;
use crate::error::AppError;
use crate::state::AppState;

/// Endpoints under `/api` reachable without a session token.
pub const PUBLIC_PATHS: &[&str] = &[
    "/api/user/register",
    "/api/user/verify-user",
    "/api/user/login",
    "/api/user/forgot",
    "/api/user/reset",
];

pub fn is_public_path(path: &str) -> bool {
    let path = path.trim_end_matches('/');
    path == "/health" || PUBLIC_PATHS.contains(&path)
}

/// Validates the `Authorization: Bearer <jwt>` header and stores the decoded
/// [`Claims`](crate::auth::Claims) in the request extensions.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public_path(req.path()) {
            return Box::pin(self.service.call(req));
        }

        let secret = match req.app_data::<web::Data<AppState>>() {
            Some(state) => state.auth.jwt_secret.clone(),
            None => {
                let app_err = AppError::InternalServerError("Application state missing".into());
                return Box::pin(async move { Err(app_err.into()) });
            }
        };

        let auth_header = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match auth_header {
            Some(token) => match verify_token(token, &secret) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    Box::pin(self.service.call(req))
                }
                Err(app_err) => {
                    log::debug!("rejected token for {}: {}", req.path(), app_err);
                    Box::pin(async move { Err(app_err.into()) })
                }
            },
            None => {
                let app_err = AppError::Unauthorized("No token, authorization denied".into());
                Box::pin(async move { Err(app_err.into()) })
            }
        }
    }
}
