//! Bearer tokens.
//!
//! A token is a signed JWT whose `jti` names a row in `personal_access_tokens`.
//! Signature and expiry are checked first; the row lookup is what makes logout
//! possible, since deleting the row invalidates the token even before it expires.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::{AuthSettings, AuthenticatedUser};
use crate::error::AppError;

/// Represents the claims encoded within a token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user's id.
    pub sub: i64,
    /// Primary key of the backing `personal_access_tokens` row.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued token together with its bookkeeping data.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

pub fn encode_claims(settings: &AuthSettings, claims: &Claims) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

/// Verifies the signature and expiry of `token` and returns its claims.
pub fn decode_claims(settings: &AuthSettings, token: &str) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Issues a token for `user_id` bound to `device_name` and records it.
pub async fn issue_token(
    pool: &SqlitePool,
    settings: &AuthSettings,
    user_id: i64,
    device_name: &str,
) -> Result<IssuedToken, AppError> {
    let now = Utc::now();
    let expires_at = now + settings.token_ttl;
    let token_id = Uuid::new_v4().to_string();

    sqlx::query("DELETE FROM personal_access_tokens WHERE user_id = $1 AND expires_at <= $2")
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await?;

    sqlx::query(
        "INSERT INTO personal_access_tokens (id, user_id, name, created_at, expires_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(&token_id)
    .bind(user_id)
    .bind(device_name)
    .bind(now)
    .bind(expires_at)
    .execute(pool)
    .await?;

    let token = encode_claims(
        settings,
        &Claims {
            sub: user_id,
            jti: token_id.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        },
    )?;

    log::info!("issued token {} for user {} ({})", token_id, user_id, device_name);

    Ok(IssuedToken {
        token,
        token_id,
        expires_at,
    })
}

/// Resolves a bearer token to the user it was issued to.
///
/// Fails with `Unauthorized` when the token is malformed, badly signed, expired, or
/// its row has been deleted by a logout.
pub async fn authenticate(
    pool: &SqlitePool,
    settings: &AuthSettings,
    token: &str,
) -> Result<AuthenticatedUser, AppError> {
    let claims = decode_claims(settings, token)?;

    let touched = sqlx::query(
        "UPDATE personal_access_tokens SET last_used_at = $1
         WHERE id = $2 AND user_id = $3 AND expires_at > $1",
    )
    .bind(Utc::now())
    .bind(&claims.jti)
    .bind(claims.sub)
    .execute(pool)
    .await?;

    if touched.rows_affected() == 0 {
        log::warn!("rejected revoked token {} for user {}", claims.jti, claims.sub);
        return Err(AppError::Unauthorized("Token has been revoked".into()));
    }

    Ok(AuthenticatedUser {
        user_id: claims.sub,
        token_id: claims.jti,
    })
}

/// Deletes a token row. Returns whether a row was removed.
pub async fn revoke_token(pool: &SqlitePool, token_id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM personal_access_tokens WHERE id = $1")
        .bind(token_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
