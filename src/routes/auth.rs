use crate::{
    auth::{AuthSettings, AuthenticatedUser, LoginRequest, RegisterRequest},
    error::AppError,
    services::users,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::SqlitePool;

/// Register a new user
///
/// ## Responses:
/// - `201 Created`: the new `User`.
/// - `422 Unprocessable Entity`: invalid fields or an email that is already taken.
#[post("/register")]
pub async fn register(
    pool: web::Data<SqlitePool>,
    settings: web::Data<AuthSettings>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let user = users::register(&pool, &settings, register_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

/// Exchange credentials for a bearer token bound to `device_name`.
///
/// ## Responses:
/// - `200 OK`: an `AuthResponse`.
/// - `401 Unauthorized`: unknown email or wrong password.
/// - `422 Unprocessable Entity`: malformed fields.
#[post("/login")]
pub async fn login(
    pool: web::Data<SqlitePool>,
    settings: web::Data<AuthSettings>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let response = users::login(&pool, &settings, login_data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/user")]
pub async fn current_user(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let user = users::current_user(&pool, &caller).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Revoke the token used for this request.
#[post("/logout")]
pub async fn logout(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    users::logout(&pool, &caller).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Logged out" })))
}
