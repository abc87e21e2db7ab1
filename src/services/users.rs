use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::auth::{
    hash_password, issue_token, revoke_token, verify_credentials, AuthResponse, AuthSettings,
    AuthenticatedUser, LoginRequest, RegisterRequest,
};
use crate::error::AppError;
use crate::models::{User, UserCredentials};

const EMAIL_TAKEN: &str = "The email has already been taken.";

/// Creates an account. Emails are unique regardless of case.
pub async fn register(
    pool: &SqlitePool,
    settings: &AuthSettings,
    input: RegisterRequest,
) -> Result<User, AppError> {
    input.validate()?;
    let email = input.email.trim().to_string();

    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE lower(email) = lower($1)")
        .bind(&email)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::invalid_field("email", "unique", EMAIL_TAKEN));
    }

    let password_hash = hash_password(&input.password, settings.bcrypt_cost)?;
    let now = Utc::now();

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (name, email, password_hash, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $4)
         RETURNING id, name, email, created_at, updated_at",
    )
    .bind(input.name.trim())
    .bind(&email)
    .bind(password_hash)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|err| {
        // Lost a race against a concurrent registration of the same address.
        let duplicate =
            matches!(&err, sqlx::Error::Database(db_err) if db_err.is_unique_violation());
        if duplicate {
            AppError::invalid_field("email", "unique", EMAIL_TAKEN)
        } else {
            AppError::from(err)
        }
    })?;

    log::info!("registered user {}", user.id);
    Ok(user)
}

/// Checks the credentials and issues a token for `input.device_name`.
///
/// Unknown email and wrong password produce the same error.
pub async fn login(
    pool: &SqlitePool,
    settings: &AuthSettings,
    input: LoginRequest,
) -> Result<AuthResponse, AppError> {
    input.validate()?;

    let credentials = sqlx::query_as::<_, UserCredentials>(
        "SELECT id, password_hash FROM users WHERE lower(email) = lower($1)",
    )
    .bind(input.email.trim())
    .fetch_optional(pool)
    .await?;

    let verified = verify_credentials(
        &input.password,
        credentials.as_ref().map(|user| user.password_hash.as_str()),
        settings.bcrypt_cost,
    )?;
    let user = match credentials {
        Some(user) if verified => user,
        _ => {
            log::warn!("failed login attempt for {}", input.email);
            return Err(AppError::Unauthorized(
                "These credentials do not match our records.".into(),
            ));
        }
    };

    let issued = issue_token(pool, settings, user.id, &input.device_name).await?;

    Ok(AuthResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        user_id: user.id,
        device_name: input.device_name,
        expires_at: issued.expires_at,
    })
}

pub async fn current_user(pool: &SqlitePool, caller: &AuthenticatedUser) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        "SELECT id, name, email, created_at, updated_at FROM users WHERE id = $1",
    )
    .bind(caller.user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Unauthorized("Unauthenticated.".into()))
}

/// Revokes only the token used for this request.
pub async fn logout(pool: &SqlitePool, caller: &AuthenticatedUser) -> Result<(), AppError> {
    if revoke_token(pool, &caller.token_id).await? {
        log::info!("user {} logged out token {}", caller.user_id, caller.token_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authenticate;
    use crate::services::testing::{pool, registration, settings, user};
    use pretty_assertions::assert_eq;

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            device_name: "service-test".to_string(),
        }
    }

    #[actix_rt::test]
    async fn test_register_rejects_duplicate_email() {
        let pool = pool().await;
        let alice = user(&pool, "Alice").await;
        assert_eq!(alice.email, "alice@example.com");

        let err = register(
            &pool,
            &settings(),
            registration("Other Alice", "ALICE@example.com"),
        )
        .await
        .unwrap_err();

        match err {
            AppError::ValidationError(errors) => {
                assert!(errors.field_errors().contains_key("email"))
            }
            other => panic!("expected ValidationError, got {:?}", other),
        }
    }

    #[actix_rt::test]
    async fn test_login_issues_usable_token() {
        let pool = pool().await;
        let alice = user(&pool, "Alice").await;

        let response = login(
            &pool,
            &settings(),
            login_request("alice@example.com", "correct horse"),
        )
        .await
        .unwrap();

        assert_eq!(response.user_id, alice.id);
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.device_name, "service-test");

        let caller = authenticate(&pool, &settings(), &response.token)
            .await
            .unwrap();
        assert_eq!(current_user(&pool, &caller).await.unwrap(), alice);

        logout(&pool, &caller).await.unwrap();
        assert!(authenticate(&pool, &settings(), &response.token)
            .await
            .is_err());
    }

    #[actix_rt::test]
    async fn test_login_mismatch_is_unauthorized() {
        let pool = pool().await;
        user(&pool, "Alice").await;

        for (email, password) in [
            ("alice@example.com", "wrong horse"),
            ("nobody@example.com", "correct horse"),
        ] {
            match login(&pool, &settings(), login_request(email, password)).await {
                Err(AppError::Unauthorized(_)) => {}
                other => panic!("expected Unauthorized for {}, got {:?}", email, other),
            }
        }
    }
}
