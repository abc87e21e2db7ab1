use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use sqlx::SqlitePool;

use crate::auth::{token::authenticate, AuthSettings};
use crate::error::AppError;

/// Paths under the protected scope that are reachable without a token.
const PUBLIC_PATHS: [&str; 2] = ["/api/login", "/api/register"];

/// Verifies the bearer token of every request except `PUBLIC_PATHS` and stores the
/// resulting `AuthenticatedUser` in the request extensions.
///
/// Needs `web::Data<SqlitePool>` and `web::Data<AuthSettings>` in the app data.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
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
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            if PUBLIC_PATHS.contains(&req.path()) {
                return service.call(req).await;
            }

            let token = bearer_token(&req)
                .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;
            let pool = req
                .app_data::<web::Data<SqlitePool>>()
                .cloned()
                .ok_or_else(|| AppError::InternalServerError("Database pool missing".into()))?;
            let settings = req
                .app_data::<web::Data<AuthSettings>>()
                .cloned()
                .ok_or_else(|| AppError::InternalServerError("Auth settings missing".into()))?;

            let user = authenticate(&pool, &settings, &token).await?;
            log::debug!("{} {} as user {}", req.method(), req.path(), user.user_id);
            req.extensions_mut().insert(user);

            service.call(req).await
        })
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
