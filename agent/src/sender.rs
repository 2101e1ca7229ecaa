//! HTTP sender for the AlertHub agent.
//!
//! [`AlertSender`] turns an event into an [`Alert`], applies the per-type
//! [`RateLimiter`], and POSTs the alert to the server:
//!
//! - Connection pooling via reqwest
//! - 5 second request timeout
//! - No retries; a failed send is reported and the limiter is untouched
//!
//! Every call yields a [`SendOutcome`]. Nothing here returns an error or
//! panics on network trouble.
//!
//! # Example
//!
//! ```no_run
//! use alerthub_agent::config::Config;
//! use alerthub_agent::sender::{AlertSender, SendOutcome};
//! use serde_json::Map;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut sender = AlertSender::new(Config::default());
//!
//!     let outcome = sender.send("cpu_high", "high", "CPU 95%", Map::new()).await;
//!     if outcome == SendOutcome::Delivered {
//!         println!("alert delivered");
//!     }
//! }
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::rate_limit::RateLimiter;
use crate::types::Alert;

/// HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Why an alert was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Sending is switched off, or no HTTP client is available.
    Disabled,

    /// An alert of the same type was accepted less than `min_interval` ago.
    RateLimited,
}

/// Why a send attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Connection error, timeout, or non-2xx response.
    Transport,
}

/// Result of one [`AlertSender::send`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The server accepted the alert.
    Delivered,

    /// The alert was deliberately not sent.
    Suppressed(SuppressReason),

    /// The alert was sent but not accepted.
    Failed(FailureReason),
}

impl SendOutcome {
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed(_))
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for SendOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered => write!(f, "delivered"),
            Self::Suppressed(SuppressReason::Disabled) => write!(f, "suppressed (disabled)"),
            Self::Suppressed(SuppressReason::RateLimited) => {
                write!(f, "suppressed (rate limited)")
            }
            Self::Failed(FailureReason::Transport) => write!(f, "failed (transport)"),
        }
    }
}

/// Rate-limited alert producer.
///
/// Sending takes `&mut self`: one sender belongs to one task. Share it
/// between tasks behind a mutex if needed.
pub struct AlertSender {
    config: Config,
    client: Option<Client>,
    limiter: RateLimiter,
}

impl AlertSender {
    /// Creates a new sender.
    ///
    /// If the HTTP client cannot be built the sender still works, but every
    /// send is suppressed as [`SuppressReason::Disabled`].
    #[must_use]
    pub fn new(config: Config) -> Self {
        let client = match build_client() {
            Ok(client) => Some(client),
            Err(err) => {
                warn!(error = %err, "HTTP client unavailable, alert sending disabled");
                None
            }
        };

        Self {
            limiter: RateLimiter::new(config.min_interval),
            config,
            client,
        }
    }

    /// Returns the sender's configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the sender's rate limiter.
    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Returns `true` if sends can reach the network.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.client.is_some()
    }

    /// Builds an alert and sends it, subject to rate limiting.
    ///
    /// The limiter is updated only when the server accepts the alert, so a
    /// failed send does not delay the next attempt.
    pub async fn send(
        &mut self,
        event_type: &str,
        severity: &str,
        message: &str,
        payload: Map<String, Value>,
    ) -> SendOutcome {
        let alert = Alert::new(
            self.config.source_id.as_str(),
            event_type,
            severity,
            message,
            payload,
        );

        let client = match (&self.client, self.config.enabled) {
            (Some(client), true) => client,
            _ => {
                debug!(event_type = %event_type, "Sending disabled, alert not sent");
                return SendOutcome::Suppressed(SuppressReason::Disabled);
            }
        };

        let now = Instant::now();
        if let Some(remaining) = self.limiter.retry_after(event_type, now) {
            debug!(
                event_type = %event_type,
                min_interval_secs = self.limiter.min_interval().as_secs_f64(),
                retry_after_secs = remaining.as_secs_f64(),
                "Alert suppressed, minimum interval not elapsed"
            );
            return SendOutcome::Suppressed(SuppressReason::RateLimited);
        }

        let response = match client.post(&self.config.server_url).json(&alert).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    event_id = %alert.id,
                    url = %self.config.server_url,
                    error = %err,
                    "Failed to send alert"
                );
                return SendOutcome::Failed(FailureReason::Transport);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                event_id = %alert.id,
                url = %self.config.server_url,
                status = status.as_u16(),
                body = %body,
                "Server rejected alert"
            );
            return SendOutcome::Failed(FailureReason::Transport);
        }

        self.limiter.record(event_type, now);
        info!(
            event_id = %alert.id,
            event_type = %event_type,
            status = status.as_u16(),
            "Alert delivered"
        );
        SendOutcome::Delivered
    }
}

impl fmt::Debug for AlertSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertSender")
            .field("config", &self.config)
            .field("client", &self.client.as_ref().map(|_| "<Client>"))
            .field("limiter", &self.limiter)
            .finish()
    }
}

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| AgentError::Http(format!("failed to create HTTP client: {e}")))
}
