use std::env;

use chrono::Duration;

/// Errors raised while reading the environment at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must be a number, got {value:?}")]
    NotANumber { name: &'static str, value: String },
}

pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    /// When unset, any origin is allowed.
    pub cors_allowed_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://taskdeck.db".to_string()),
            server_port: parse_var("SERVER_PORT", 8080)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            token_ttl_hours: parse_var("TOKEN_TTL_HOURS", 24)?,
            bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .ok()
                .filter(|origin| !origin.is_empty()),
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::hours(self.token_ttl_hours)
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::NotANumber { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test owns every variable it touches; env vars are process-global.
    #[test]
    fn test_config_from_env() {
        env::remove_var("DATABASE_URL");
        env::remove_var("SERVER_PORT");
        env::remove_var("SERVER_HOST");
        env::remove_var("TOKEN_TTL_HOURS");
        env::remove_var("CORS_ALLOWED_ORIGIN");
        env::remove_var("JWT_SECRET");

        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));

        env::set_var("JWT_SECRET", "config-test-secret");
        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, "sqlite://taskdeck.db");
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.token_ttl(), Duration::hours(24));
        assert!(config.cors_allowed_origin.is_none());

        env::set_var("SERVER_PORT", "3000");
        env::set_var("SERVER_HOST", "0.0.0.0");
        env::set_var("CORS_ALLOWED_ORIGIN", "http://localhost:5173");

        let config = Config::from_env().unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.server_url(), "http://0.0.0.0:3000");
        assert_eq!(
            config.cors_allowed_origin.as_deref(),
            Some("http://localhost:5173")
        );

        env::set_var("SERVER_PORT", "eighty");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::NotANumber { name: "SERVER_PORT", .. })
        ));

        env::remove_var("SERVER_PORT");
        env::remove_var("SERVER_HOST");
        env::remove_var("CORS_ALLOWED_ORIGIN");
    }
}
