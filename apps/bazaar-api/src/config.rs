//! API server configuration.
//!
//! Loaded from environment variables with development defaults.

use bazaar_db::DbConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file, or `:memory:`
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// HS256 secret shared with the identity provider
    pub jwt_secret: String,

    /// Lifetime of tokens minted by `dev_token`
    pub jwt_lifetime_secs: i64,

    /// Allowed CORS origin for the storefront/back-office frontend
    pub cors_origin: String,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ApiConfig {
            http_port: parse_var("BAZAAR_HTTP_PORT", 8080)?,

            database_path: env::var("BAZAAR_DATABASE_PATH")
                .unwrap_or_else(|_| "./bazaar_dev.db".to_string()),

            db_max_connections: parse_var("BAZAAR_DB_MAX_CONNECTIONS", 10)?,

            jwt_secret: env::var("BAZAAR_JWT_SECRET")
                // In production, this MUST be set via environment variable
                .unwrap_or_else(|_| "bazaar-dev-secret-change-in-production".to_string()),

            jwt_lifetime_secs: parse_var("BAZAAR_JWT_LIFETIME_SECS", 3600)?, // 1 hour

            cors_origin: env::var("BAZAAR_CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("BAZAAR_JWT_SECRET".to_string()));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("BAZAAR_DB_MAX_CONNECTIONS".to_string()));
        }
        if self.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("BAZAAR_JWT_LIFETIME_SECS".to_string()));
        }
        Ok(())
    }

    /// Database pool settings derived from this config.
    pub fn db_config(&self) -> DbConfig {
        if self.database_path == ":memory:" {
            return DbConfig::in_memory();
        }
        DbConfig::new(&self.database_path).max_connections(self.db_max_connections)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ApiConfig {
        ApiConfig {
            http_port: 8080,
            database_path: ":memory:".to_string(),
            db_max_connections: 4,
            jwt_secret: "secret".to_string(),
            jwt_lifetime_secs: 60,
            cors_origin: "http://localhost:3000".to_string(),
        }
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut config = sample();
        assert!(config.validate().is_ok());

        config.jwt_secret = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingRequired(_))));
    }

    #[test]
    fn test_memory_path_uses_in_memory_pool() {
        assert!(sample().db_config().is_in_memory());

        let mut config = sample();
        config.database_path = "/tmp/bazaar.db".to_string();
        assert_eq!(config.db_config().max_connections, 4);
    }
}
