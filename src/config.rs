use chrono::Duration;
use thiserror::Error;
use tracing::warn;

use crate::session::token::TokenKeys;

const DEV_ACCESS_SECRET: &str = "dev-access-secret-change-in-production";
const DEV_REFRESH_SECRET: &str = "dev-refresh-secret-change-in-production";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    EmptySecret(&'static str),

    #[error("ACCESS_SECRET and REFRESH_SECRET must differ")]
    SharedSecret,
}

/// Process configuration, read once at startup
#[derive(Clone)]
pub struct AppConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub refresh_cookie_ttl: Duration,
    pub store_timeout: std::time::Duration,
    pub cleanup_interval: std::time::Duration,
    pub database_url: Option<String>,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            access_secret: DEV_ACCESS_SECRET.to_string(),
            refresh_secret: DEV_REFRESH_SECRET.to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            refresh_cookie_ttl: Duration::minutes(120),
            store_timeout: std::time::Duration::from_secs(3),
            cleanup_interval: std::time::Duration::from_secs(30 * 60),
            database_url: None,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let access_secret = std::env::var("ACCESS_SECRET").unwrap_or_else(|_| {
            warn!("ACCESS_SECRET not set, using development secret");
            defaults.access_secret.clone()
        });
        let refresh_secret = std::env::var("REFRESH_SECRET").unwrap_or_else(|_| {
            warn!("REFRESH_SECRET not set, using development secret");
            defaults.refresh_secret.clone()
        });

        let config = Self {
            access_secret,
            refresh_secret,
            access_ttl: Duration::minutes(env_or("ACCESS_TOKEN_TTL_MINUTES", 15)),
            refresh_ttl: Duration::hours(env_or("REFRESH_TOKEN_TTL_HOURS", 24 * 7)),
            refresh_cookie_ttl: Duration::minutes(env_or("REFRESH_COOKIE_TTL_MINUTES", 120)),
            store_timeout: std::time::Duration::from_millis(env_or("STORE_TIMEOUT_MS", 3000)),
            cleanup_interval: std::time::Duration::from_secs(env_or(
                "SESSION_CLEANUP_INTERVAL_SECS",
                30 * 60,
            )),
            database_url: std::env::var("DATABASE_URL").ok(),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.is_empty() {
            return Err(ConfigError::EmptySecret("ACCESS_SECRET"));
        }
        if self.refresh_secret.is_empty() {
            return Err(ConfigError::EmptySecret("REFRESH_SECRET"));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::SharedSecret);
        }
        Ok(())
    }

    /// Builds the immutable signing keys
    pub fn token_keys(&self) -> TokenKeys {
        TokenKeys::new(
            self.access_secret.as_bytes(),
            self.refresh_secret.as_bytes(),
            self.access_ttl,
            self.refresh_ttl,
        )
    }
}
