use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::auth::token::Claims;
use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// Extracts the authenticated user's id from the claims stored by `AuthMiddleware`.
///
/// Fails with `AppError::Unauthorized` if the middleware did not run.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUserId(pub Uuid);

impl FromRequest for AuthenticatedUserId {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticated_user_id(req).map_err(Into::into))
    }
}

fn authenticated_user_id(req: &HttpRequest) -> Result<AuthenticatedUserId, AppError> {
    req.extensions()
        .get::<Claims>()
        .map(|claims| AuthenticatedUserId(claims.sub))
        .ok_or_else(|| {
            AppError::Unauthorized(
                "User ID not found in request. Ensure AuthMiddleware is active.".to_string(),
            )
        })
}

/// The full user record behind the session token.
///
/// A token whose user has since been removed yields `404 User not found`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    /// Supervisors and admins pass.
    pub fn require_supervisor(&self) -> Result<(), AppError> {
        if self.0.is_supervisor() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You are not a supervisor, access denied".into(),
            ))
        }
    }

    pub fn require_operator(&self) -> Result<(), AppError> {
        if self.0.is_operator() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You are not an operator, access denied".into(),
            ))
        }
    }
}

impl FromRequest for CurrentUser {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = authenticated_user_id(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let AuthenticatedUserId(user_id) = user_id?;
            let state = state.ok_or_else(|| {
                AppError::InternalServerError("Application state missing".into())
            })?;
            let user = state
                .store
                .find_user_by_id(user_id)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".into()))?;
            Ok(CurrentUser(user))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_rt::test]
    async fn test_authenticated_user_id_extractor_success() {
        let user_id = Uuid::new_v4();
        let req = test::TestRequest::default().to_http_request();
        req.extensions_mut().insert(Claims {
            sub: user_id,
            exp: usize::MAX,
        });

        let mut payload = Payload::None;
        let extracted = AuthenticatedUserId::from_request(&req, &mut payload)
            .await
            .unwrap();
        assert_eq!(extracted.0, user_id);
    }

    #[actix_rt::test]
    async fn test_authenticated_user_id_extractor_failure() {
        let req = test::TestRequest::default().to_http_request();

        let mut payload = Payload::None;
        let result = AuthenticatedUserId::from_request(&req, &mut payload).await;

        let err = result.unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }
}
