use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered account, as returned by the API. The password hash never leaves
/// the `users` table through this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The columns needed to check a login attempt.
#[derive(Debug, FromRow)]
pub struct UserCredentials {
    pub id: i64,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_json_has_no_password_fields() {
        let user = User {
            id: 7,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();

        assert_eq!(json["email"], "alice@example.com");
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
    }
}
