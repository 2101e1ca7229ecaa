//! Configuration module for the AlertHub agent.
//!
//! This module handles parsing configuration from environment variables.
//! Command-line flags in the binary take precedence over these values.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `ALERT_SERVER_URL` | No | `http://127.0.0.1:8000/alert` | Full URL of the ingestion endpoint |
//! | `ALERTHUB_SOURCE_ID` | No | hostname | Agent identifier placed in every alert |
//! | `ALERTHUB_MIN_INTERVAL_SECS` | No | 5.0 | Minimum seconds between two sends of one event type |
//! | `ALERTHUB_ENABLED` | No | `true` | Set to `false` to suppress all sends |
//!
//! # Example
//!
//! ```no_run
//! use alerthub_agent::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Server URL: {}", config.server_url);
//! ```

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::rate_limit::DEFAULT_MIN_INTERVAL;

/// Default ingestion endpoint.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000/alert";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Configuration for the AlertHub agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Full URL alerts are POSTed to.
    pub server_url: String,

    /// Agent identifier, copied into each alert's `source` field.
    pub source_id: String,

    /// Minimum spacing between two accepted sends of one event type.
    pub min_interval: Duration,

    /// When `false`, every send is suppressed without network activity.
    pub enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            source_id: get_hostname(),
            min_interval: DEFAULT_MIN_INTERVAL,
            enabled: true,
        }
    }
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// Every variable is optional.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `ALERTHUB_MIN_INTERVAL_SECS` is not a finite, non-negative number
    /// - `ALERTHUB_ENABLED` is not a recognizable boolean
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url =
            env::var("ALERT_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());

        let source_id = env::var("ALERTHUB_SOURCE_ID").unwrap_or_else(|_| get_hostname());

        let min_interval = match env::var("ALERTHUB_MIN_INTERVAL_SECS") {
            Ok(val) => parse_interval("ALERTHUB_MIN_INTERVAL_SECS", &val)?,
            Err(_) => DEFAULT_MIN_INTERVAL,
        };

        let enabled = match env::var("ALERTHUB_ENABLED") {
            Ok(val) => parse_bool("ALERTHUB_ENABLED", &val)?,
            Err(_) => true,
        };

        Ok(Self {
            server_url,
            source_id,
            min_interval,
            enabled,
        })
    }
}

/// Parses a non-negative number of seconds, fractions allowed.
pub fn parse_interval(key: &str, val: &str) -> Result<Duration, ConfigError> {
    let secs = val
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected number of seconds, got '{val}'"),
        })?;

    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("interval must be a finite, non-negative number, got '{val}'"),
    })
}

fn parse_bool(key: &str, val: &str) -> Result<bool, ConfigError> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected true or false, got '{val}'"),
        }),
    }
}

/// Gets the system hostname, falling back to "unknown" if it cannot be determined.
fn get_hostname() -> String {
    gethostname::gethostname()
        .into_string()
        .unwrap_or_else(|_| "unknown".to_string())
}
