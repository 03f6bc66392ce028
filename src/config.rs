//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Default number of questions per assessment
pub const DEFAULT_SAMPLE_SIZE: usize = 20;

/// Accepted range for `STALE_TRANSFER_HOURS` (one hour to ten years)
pub const STALE_TRANSFER_HOURS_RANGE: std::ops::RangeInclusive<i64> = 1..=87_600;

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

    /// Allowed CORS origin of the web frontend
    pub frontend_url: String,

    /// Questions served per assessment
    pub question_sample_size: usize,

    /// Let settlement push a sender below zero
    pub allow_overdraft: bool,

    /// Hex SHA-256 of the gateway API key; unset disables the check
    pub gateway_api_key_sha256: Option<String>,

    /// Apply embedded migrations at startup
    pub run_migrations: bool,

    /// Pending transfers older than this are reported by the maintenance job
    pub stale_transfer_hours: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 10)?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = parse_env("PORT", 3001)?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let question_sample_size = parse_env("QUESTION_SAMPLE_SIZE", DEFAULT_SAMPLE_SIZE)?;
        if question_sample_size == 0 {
            return Err(ConfigError::InvalidValue("QUESTION_SAMPLE_SIZE"));
        }

        let allow_overdraft = parse_env("ALLOW_OVERDRAFT", false)?;

        let gateway_api_key_sha256 = match env::var("GATEWAY_API_KEY_SHA256") {
            Ok(hash) if !hash.trim().is_empty() => {
                let hash = hash.trim().to_lowercase();
                if hash.len() != 64 || hex::decode(&hash).is_err() {
                    return Err(ConfigError::InvalidValue("GATEWAY_API_KEY_SHA256"));
                }
                Some(hash)
            }
            _ => None,
        };

        let run_migrations = parse_env("RUN_MIGRATIONS", true)?;

        let stale_transfer_hours =
            check_stale_transfer_hours(parse_env("STALE_TRANSFER_HOURS", 24)?)?;

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            frontend_url,
            question_sample_size,
            allow_overdraft,
            gateway_api_key_sha256,
            run_migrations,
            stale_transfer_hours,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Read an optional variable, falling back to `default` when unset.
fn parse_env<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

fn check_stale_transfer_hours(hours: i64) -> Result<i64, ConfigError> {
    if STALE_TRANSFER_HOURS_RANGE.contains(&hours) {
        Ok(hours)
    } else {
        Err(ConfigError::InvalidValue("STALE_TRANSFER_HOURS"))
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
    fn test_parse_env_default_when_unset() {
        let value: u16 = parse_env("APTITUDE_LEDGER_TEST_UNSET_PORT", 4242).unwrap();
        assert_eq!(value, 4242);
    }

    #[test]
    fn test_parse_env_invalid_value() {
        env::set_var("APTITUDE_LEDGER_TEST_BAD_BOOL", "maybe");
        let result: Result<bool, _> = parse_env("APTITUDE_LEDGER_TEST_BAD_BOOL", false);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue("APTITUDE_LEDGER_TEST_BAD_BOOL"))
        ));
    }

    #[test]
    fn test_parse_env_reads_value() {
        env::set_var("APTITUDE_LEDGER_TEST_HOURS", " 6 ");
        let value: i64 = parse_env("APTITUDE_LEDGER_TEST_HOURS", 24).unwrap();
        assert_eq!(value, 6);
    }

    #[test]
    fn test_stale_transfer_hours_bounds() {
        assert_eq!(check_stale_transfer_hours(1).unwrap(), 1);
        assert_eq!(check_stale_transfer_hours(87_600).unwrap(), 87_600);

        for hours in [0, -24, 87_601, i64::MAX] {
            assert!(matches!(
                check_stale_transfer_hours(hours),
                Err(ConfigError::InvalidValue("STALE_TRANSFER_HOURS"))
            ));
        }
    }
}
