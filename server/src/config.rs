//! Server configuration module.
//!
//! Parses configuration from environment variables for the AlertHub server.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `PORT` | No | 8000 | HTTP server port |
//! | `ALERTHUB_BIND_ADDR` | No | `0.0.0.0` | Listen address |
//! | `ALERTHUB_MAX_ALERTS` | No | 200 | Number of alerts kept in history |
//! | `ALERTHUB_SUBSCRIBER_QUEUE` | No | 64 | Outbound queue size per WebSocket client |
//! | `TWILIO_ACCOUNT_SID` | No* | - | Twilio account SID |
//! | `TWILIO_AUTH_TOKEN` | No* | - | Twilio auth token |
//! | `TWILIO_FROM` | No* | - | Sending phone number |
//! | `TWILIO_TO` | No* | - | Destination phone number |
//!
//! *SMS escalation is enabled only when all four `TWILIO_*` variables are set.

use std::env;

use thiserror::Error;

use crate::broadcast::DEFAULT_SUBSCRIBER_QUEUE;
use crate::escalation::SmsConfig;
use crate::history::DEFAULT_MAX_ALERTS;

/// Default HTTP server port.
const DEFAULT_PORT: u16 = 8000;

/// Default listen address.
const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),

    /// Configuration validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Server configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,

    /// Address the HTTP listener binds to.
    pub bind_addr: String,

    /// Maximum number of alerts kept in history.
    pub max_alerts: usize,

    /// Capacity of each WebSocket subscriber's outbound queue.
    pub subscriber_queue: usize,

    /// SMS escalation settings, present only when fully configured.
    pub sms: Option<SmsConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_alerts: DEFAULT_MAX_ALERTS,
            subscriber_queue: DEFAULT_SUBSCRIBER_QUEUE,
            sms: None,
        }
    }
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Port number is not a valid u16
    /// - `ALERTHUB_MAX_ALERTS` or `ALERTHUB_SUBSCRIBER_QUEUE` is not a positive integer
    ///
    /// # Example
    ///
    /// ```no_run
    /// use alerthub_server::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Server will listen on port {}", config.port);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_port()?;
        let bind_addr = env::var("ALERTHUB_BIND_ADDR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let max_alerts = parse_positive_usize("ALERTHUB_MAX_ALERTS", DEFAULT_MAX_ALERTS)?;
        let subscriber_queue =
            parse_positive_usize("ALERTHUB_SUBSCRIBER_QUEUE", DEFAULT_SUBSCRIBER_QUEUE)?;
        let sms = parse_sms_config();

        let config = Self {
            port,
            bind_addr,
            max_alerts,
            subscriber_queue,
            sms,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Ensures capacities are non-zero. `from_env` already guarantees this,
    /// but configs built by hand go through the same check when passed to
    /// [`Broker::from_config`](crate::broker::Broker::from_config).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_alerts == 0 {
            return Err(ConfigError::ValidationError(
                "max_alerts must be at least 1".to_string(),
            ));
        }

        if self.subscriber_queue == 0 {
            return Err(ConfigError::ValidationError(
                "subscriber_queue must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns `host:port` for the HTTP listener.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Parse the PORT environment variable.
///
/// Returns the default port if not set.
fn parse_port() -> Result<u16, ConfigError> {
    match env::var("PORT") {
        Ok(port_str) => Ok(port_str.parse()?),
        Err(env::VarError::NotPresent) => Ok(DEFAULT_PORT),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: "PORT".to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

/// Parse a positive integer environment variable, falling back to `default`.
fn parse_positive_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    let raw = match env::var(name) {
        Ok(s) if !s.trim().is_empty() => s,
        _ => return Ok(default),
    };

    let value = raw
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidFormat {
            var: name.to_string(),
            message: format!("expected positive integer, got '{raw}'"),
        })?;

    if value == 0 {
        return Err(ConfigError::InvalidFormat {
            var: name.to_string(),
            message: "must be greater than 0".to_string(),
        });
    }

    Ok(value)
}

/// Reads a non-empty environment variable.
fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.is_empty())
}

/// Builds the SMS config if all four Twilio variables are present.
fn parse_sms_config() -> Option<SmsConfig> {
    Some(SmsConfig {
        account_sid: non_empty_env("TWILIO_ACCOUNT_SID")?,
        auth_token: non_empty_env("TWILIO_AUTH_TOKEN")?,
        from: non_empty_env("TWILIO_FROM")?,
        to: non_empty_env("TWILIO_TO")?,
    })
}
