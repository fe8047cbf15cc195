use dotenvy::dotenv;
use shuttle_runtime::SecretStore;
use std::env;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not found in secrets or environment")]
    Missing(&'static str),
}

/// Process-wide settings, read once at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub database_url: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("jwt_secret", &"<redacted>")
            .field("database_url", &"<redacted>")
            .finish()
    }
}

impl AppConfig {
    /// Shuttle secrets first, then the process environment (with `.env` loaded).
    pub fn from_secrets(secrets: &SecretStore) -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| secrets.get(key).or_else(|| env::var(key).ok()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        Ok(AppConfig {
            jwt_secret: require("JWT_SECRET")?,
            database_url: require("DATABASE_URL")?,
        })
    }
}
