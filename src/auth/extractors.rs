use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;

/// The caller behind a verified bearer token.
///
/// `AuthMiddleware` inserts it into the request extensions; handlers take it as an
/// argument. Missing means the middleware did not run for this route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    /// Id of the token used for this request, so logout can revoke exactly it.
    pub token_id: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>().cloned() {
            Some(user) => ready(Ok(user)),
            None => {
                let err = AppError::Unauthorized("Unauthenticated.".to_string());
                ready(Err(err.into()))
            }
        }
    }
}
