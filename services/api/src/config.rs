//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. Every external collaborator is optional:
//! a missing database URL selects the in-memory store, a missing API key or SMTP
//! host turns the matching feature off instead of failing startup.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: Option<String>,
    pub log_level: Level,
    pub environment: Environment,
    pub cors_origin: String,
    pub frontend_url: String,
    pub session_ttl_days: i64,
    pub openai_api_key: Option<String>,
    pub ai_model: String,
    pub smtp: Option<SmtpConfig>,
    pub storage: Option<StorageConfig>,
    pub rate_limit_window: Duration,
    pub rate_limit_max_requests: u64,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    var_or(name, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address = parse_var::<SocketAddr>("BIND_ADDRESS", "0.0.0.0:5000")?;
        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let environment = match var_or("APP_ENV", "development").to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "production" | "prod" => Environment::Production,
            other => {
                return Err(ConfigError::InvalidValue(
                    "APP_ENV".to_string(),
                    format!("'{}' is not development or production", other),
                ))
            }
        };

        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:3000");
        let frontend_url = var_or("FRONTEND_URL", "http://localhost:3000");
        let session_ttl_days = parse_var::<i64>("SESSION_TTL_DAYS", "30")?;

        // --- Load API Keys (as optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok().filter(|s| !s.is_empty());
        let ai_model = var_or("AI_MODEL", "gpt-4o-mini");

        let smtp = match std::env::var("SMTP_HOST").ok().filter(|s| !s.is_empty()) {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_var::<u16>("SMTP_PORT", "587")?,
                username: std::env::var("SMTP_USERNAME").ok(),
                password: std::env::var("SMTP_PASSWORD").ok(),
                from: std::env::var("MAIL_FROM")
                    .map_err(|_| ConfigError::MissingVar("MAIL_FROM".to_string()))?,
            }),
            None => None,
        };

        let storage = match std::env::var("STORAGE_BASE_URL").ok().filter(|s| !s.is_empty()) {
            Some(base_url) => Some(StorageConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key: std::env::var("STORAGE_API_KEY")
                    .map_err(|_| ConfigError::MissingVar("STORAGE_API_KEY".to_string()))?,
            }),
            None => None,
        };

        // --- Load Rate Limiting Settings ---
        let rate_limit_window =
            Duration::from_secs(parse_var::<u64>("RATE_LIMIT_WINDOW_SECS", "60")?);
        let rate_limit_max_requests = parse_var::<u64>("RATE_LIMIT_MAX_REQUESTS", "100")?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            environment,
            cors_origin,
            frontend_url,
            session_ttl_days,
            openai_api_key,
            ai_model,
            smtp,
            storage,
            rate_limit_window,
            rate_limit_max_requests,
        })
    }

    /// Defaults suitable for tests: in-memory store, no collaborators.
    pub fn for_tests() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: None,
            log_level: Level::INFO,
            environment: Environment::Development,
            cors_origin: "http://localhost:3000".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            session_ttl_days: 30,
            openai_api_key: None,
            ai_model: "gpt-4o-mini".to_string(),
            smtp: None,
            storage: None,
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max_requests: 1000,
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}
