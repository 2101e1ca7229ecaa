//! Out-of-band escalation of alerts via SMS.
//!
//! Every accepted alert is summarized as `[SEVERITY] event_type - message`
//! and handed to the [`Escalator`]. The escalator sends the summary through
//! the Twilio Messages API when it is configured, and does nothing otherwise.
//!
//! # Isolation
//!
//! Escalation never sits on the ingestion path. [`Escalator::dispatch`]
//! spawns the provider call onto its own tokio task and returns immediately;
//! the task's result is logged and discarded. A slow, failing or
//! misconfigured provider therefore cannot delay or fail an ingestion.
//!
//! # Example
//!
//! ```rust,ignore
//! use alerthub_server::escalation::{Escalator, SmsConfig, SmsNotifier};
//!
//! let notifier = SmsNotifier::new(SmsConfig {
//!     account_sid: "AC123".into(),
//!     auth_token: "secret".into(),
//!     from: "+15550001".into(),
//!     to: "+15550002".into(),
//! })?;
//! let escalator = Escalator::new(Some(notifier));
//!
//! escalator.dispatch("[HIGH] cpu_high - CPU 95%".to_string());
//! ```

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Timeout for a single SMS provider request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Production base URL of the Twilio REST API.
pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Errors that can occur when sending an escalation message.
#[derive(Debug, Error)]
pub enum EscalationError {
    /// The provider did not answer within [`REQUEST_TIMEOUT`].
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The provider could not be reached.
    #[error("sms provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with a non-success status.
    #[error("sms provider rejected message: {status} - {body}")]
    Rejected {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The HTTP client could not be built.
    #[error("client configuration error: {0}")]
    Configuration(String),
}

/// Credentials and phone numbers for the SMS provider.
///
/// All four values are required; the server only builds an [`SmsNotifier`]
/// when every one of them is present.
#[derive(Clone, PartialEq, Eq)]
pub struct SmsConfig {
    /// Twilio account SID, also used as the basic-auth username.
    pub account_sid: String,

    /// Twilio auth token, used as the basic-auth password.
    pub auth_token: String,

    /// Sending phone number.
    pub from: String,

    /// Destination phone number.
    pub to: String,
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

/// Client for the Twilio Messages API.
#[derive(Debug, Clone)]
pub struct SmsNotifier {
    http_client: Client,
    base_url: String,
    config: SmsConfig,
}

impl SmsNotifier {
    /// Creates a notifier that talks to the production Twilio API.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError::Configuration`] if the HTTP client cannot be created.
    pub fn new(config: SmsConfig) -> Result<Self, EscalationError> {
        Self::with_base_url(config, TWILIO_API_BASE)
    }

    /// Creates a notifier that talks to a custom API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError::Configuration`] if the HTTP client cannot be created.
    pub fn with_base_url(
        config: SmsConfig,
        base_url: impl Into<String>,
    ) -> Result<Self, EscalationError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                EscalationError::Configuration(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            http_client,
            base_url,
            config,
        })
    }

    /// Sends one SMS with the given body.
    ///
    /// # Errors
    ///
    /// - [`EscalationError::Timeout`] - No answer within 10 seconds
    /// - [`EscalationError::Unavailable`] - Connection or request failure
    /// - [`EscalationError::Rejected`] - Non-2xx response from the provider
    pub async fn send(&self, text: &str) -> Result<(), EscalationError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.config.account_sid
        );

        debug!(url = %url, "Sending escalation SMS");

        let form = [
            ("From", self.config.from.as_str()),
            ("To", self.config.to.as_str()),
            ("Body", text),
        ];

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EscalationError::Timeout(REQUEST_TIMEOUT)
                } else if e.is_connect() {
                    EscalationError::Unavailable(format!("connection failed: {e}"))
                } else {
                    EscalationError::Unavailable(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EscalationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// Fire-and-forget dispatcher in front of an optional [`SmsNotifier`].
///
/// Cloning is cheap; all clones share the same notifier.
#[derive(Debug, Clone, Default)]
pub struct Escalator {
    notifier: Option<Arc<SmsNotifier>>,
}

impl Escalator {
    #[must_use]
    pub fn new(notifier: Option<SmsNotifier>) -> Self {
        Self {
            notifier: notifier.map(Arc::new),
        }
    }

    /// An escalator that never sends anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.notifier.is_some()
    }

    /// Sends `text` in the background.
    ///
    /// Returns immediately. When no notifier is configured this is a silent
    /// no-op and `None` is returned. Otherwise the handle of the spawned task
    /// is returned; callers on the ingestion path drop it without awaiting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, text: String) -> Option<JoinHandle<()>> {
        let Some(notifier) = self.notifier.as_ref() else {
            trace!("Escalation not configured, skipping");
            return None;
        };

        let notifier = Arc::clone(notifier);
        Some(tokio::spawn(async move {
            match notifier.send(&text).await {
                Ok(()) => info!(text = %text, "Escalation SMS sent"),
                Err(err) => warn!(error = %err, "Escalation SMS failed, discarding"),
            }
        }))
    }
}
