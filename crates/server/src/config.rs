//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CHAIRBOOK_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `CHAIRBOOK_IDENTITY_URL` - Base URL of the hosted identity provider
//!
//! ## Optional
//! - `CHAIRBOOK_HOST` - Bind address (default: 127.0.0.1)
//! - `CHAIRBOOK_PORT` - Listen port (default: 3000)
//! - `CHAIRBOOK_SESSION_COOKIE` - Cookie carrying the session token (default: `__session`)
//! - `CHAIRBOOK_IDENTITY_CACHE_SECONDS` - How long a resolved session is cached (default: 60)
//! - `CHAIRBOOK_DEFAULT_DAILY_CAPACITY` - Bookings per day for shops without their own capacity (default: 32)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0 to 1.0 (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Booking server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Hosted identity provider settings
    pub identity: IdentityConfig,
    /// Daily capacity used when a shop has none configured
    pub default_daily_capacity: u32,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Hosted identity provider settings.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Base URL, e.g. `https://auth.example.com`
    pub base_url: Url,
    /// Name of the cookie that carries the session token
    pub session_cookie: String,
    /// How long a resolved session stays cached
    pub cache_ttl: Duration,
    /// Timeout for a single provider request
    pub request_timeout: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("CHAIRBOOK_DATABASE_URL")?;
        let host = parse_env("CHAIRBOOK_HOST", "127.0.0.1")?;
        let port = parse_env("CHAIRBOOK_PORT", "3000")?;
        let identity = IdentityConfig::from_env()?;
        let default_daily_capacity =
            parse_env::<u32>("CHAIRBOOK_DEFAULT_DAILY_CAPACITY", "32")?;
        if default_daily_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CHAIRBOOK_DEFAULT_DAILY_CAPACITY".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            identity,
            default_daily_capacity,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_rate("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl IdentityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("CHAIRBOOK_IDENTITY_URL")?;
        let base_url = Url::parse(&raw).map_err(|e| {
            ConfigError::InvalidEnvVar("CHAIRBOOK_IDENTITY_URL".to_string(), e.to_string())
        })?;
        let cache_seconds = parse_env::<u64>("CHAIRBOOK_IDENTITY_CACHE_SECONDS", "60")?;

        Ok(Self {
            base_url,
            session_cookie: get_env_or_default("CHAIRBOOK_SESSION_COOKIE", "__session"),
            cache_ttl: Duration::from_secs(cache_seconds),
            request_timeout: Duration::from_secs(5),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a sample rate in `0.0..=1.0`.
fn parse_rate(key: &str, default: &str) -> Result<f32, ConfigError> {
    let rate = parse_env::<f32>(key, default)?;
    check_rate(key, rate)
}

fn check_rate(key: &str, rate: f32) -> Result<f32, ConfigError> {
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            database_url: SecretString::from("postgres://localhost/chairbook"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            identity: IdentityConfig {
                base_url: Url::parse("http://localhost:4000").unwrap(),
                session_cookie: "__session".to_string(),
                cache_ttl: Duration::from_secs(60),
                request_timeout: Duration::from_secs(5),
            },
            default_daily_capacity: 32,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u16>("PORT", " 8080 ").unwrap(), 8080);
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "PORT"));
    }

    #[test]
    fn test_check_rate_bounds() {
        assert!(check_rate("RATE", 0.0).is_ok());
        assert!(check_rate("RATE", 1.0).is_ok());
        assert!(check_rate("RATE", 1.5).is_err());
        assert!(check_rate("RATE", -0.1).is_err());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let debug_output = format!("{:?}", config());
        assert!(!debug_output.contains("postgres://localhost/chairbook"));
    }
}
