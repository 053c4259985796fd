//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Upper bound for a single store call
    pub store_timeout: Duration,

    /// Maximum number of devices kept in the lookup cache
    pub device_cache_capacity: usize,

    /// Lifetime of a device lookup cache entry
    pub device_cache_ttl: Duration,

    /// Page size used when a list request does not carry one
    pub default_page_size: u32,

    /// Period of the device status reconciliation job
    pub reconcile_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 10)?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = parse_or("PORT", 7074)?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let store_timeout = Duration::from_millis(parse_or("STORE_TIMEOUT_MS", 5000)?);

        let device_cache_capacity = parse_or("DEVICE_CACHE_CAPACITY", 1024)?;
        if device_cache_capacity == 0 {
            return Err(ConfigError::InvalidValue("DEVICE_CACHE_CAPACITY"));
        }

        let device_cache_ttl = Duration::from_secs(positive_or("DEVICE_CACHE_TTL_SECS", 60)?);

        let default_page_size = parse_or("DEFAULT_PAGE_SIZE", 10)?;

        let reconcile_interval =
            Duration::from_secs(positive_or("JOB_RECONCILE_INTERVAL_SECS", 300)?);

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            store_timeout,
            device_cache_capacity,
            device_cache_ttl,
            default_page_size,
            reconcile_interval,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Read an optional variable, falling back to `default` when it is unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

/// Like [`parse_or`], but zero is rejected.
fn positive_or(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match parse_or(name, default)? {
        0 => Err(ConfigError::InvalidValue(name)),
        value => Ok(value),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_uses_default_when_unset() {
        let value: u32 = parse_or("SCENE_DIRECTORY_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        env::set_var("SCENE_DIRECTORY_TEST_GARBAGE", "not-a-number");
        let result: Result<u16, _> = parse_or("SCENE_DIRECTORY_TEST_GARBAGE", 1);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue("SCENE_DIRECTORY_TEST_GARBAGE"))
        ));
        env::remove_var("SCENE_DIRECTORY_TEST_GARBAGE");
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        env::set_var("SCENE_DIRECTORY_TEST_ZERO_INTERVAL", "0");
        assert!(matches!(
            positive_or("SCENE_DIRECTORY_TEST_ZERO_INTERVAL", 60),
            Err(ConfigError::InvalidValue("SCENE_DIRECTORY_TEST_ZERO_INTERVAL"))
        ));

        env::set_var("SCENE_DIRECTORY_TEST_SOME_INTERVAL", "30");
        assert_eq!(positive_or("SCENE_DIRECTORY_TEST_SOME_INTERVAL", 60).unwrap(), 30);
        assert_eq!(positive_or("SCENE_DIRECTORY_TEST_UNSET_INTERVAL", 60).unwrap(), 60);
    }
}
