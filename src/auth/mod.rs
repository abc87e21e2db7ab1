pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::Config;

pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_credentials, verify_password};
pub use token::{authenticate, issue_token, revoke_token, Claims, IssuedToken};

lazy_static! {
    // Device names end up in logs and token listings: printable, no control characters.
    static ref DEVICE_NAME_REGEX: regex::Regex =
        regex::Regex::new(r"^[\w .:@()/-]+$").unwrap();
}

/// Secrets and cost parameters shared by the auth handlers and the middleware.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            token_ttl: config.token_ttl(),
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}

/// Payload for `POST /api/login`.
///
/// Missing fields deserialize as empty strings so they fail validation per field (422)
/// instead of failing the JSON extractor (400).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "The password field is required."))]
    pub password: String,
    /// Name of the client the token is issued to, e.g. `"taskdeck-client"`.
    #[validate(
        length(min = 1, max = 255),
        regex(
            path = "DEVICE_NAME_REGEX",
            message = "The device name may only contain letters, digits, spaces and . : @ ( ) / - _"
        )
    )]
    pub device_name: String,
}

/// Payload for `POST /api/register`. Missing fields are treated as empty, like `LoginRequest`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(
        length(min = 8, message = "The password must be at least 8 characters."),
        must_match = "password_confirmation"
    )]
    pub password: String,
    pub password_confirmation: String,
}

/// Response of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for the `Authorization` header.
    pub token: String,
    pub token_type: String,
    pub user_id: i64,
    pub device_name: String,
    pub expires_at: DateTime<Utc>,
}
