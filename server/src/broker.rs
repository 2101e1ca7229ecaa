//! The alert broker: bounded history, live fan-out and escalation.
//!
//! [`Broker`] is the single owner of the server's mutable state. Route
//! handlers share it through an `Arc` inside [`AppState`](crate::routes::AppState).
//!
//! # Ingestion
//!
//! [`Broker::ingest`] performs, in order:
//!
//! 1. Append to history, evicting the oldest alert if over capacity
//! 2. Fan out to every live subscriber, dropping those whose push fails
//! 3. Dispatch escalation on a detached task
//!
//! Steps 1 and 2 run under one ordering lock, so concurrent ingestions are
//! serialized and every subscriber observes alerts in history order. Step 3
//! is never awaited.
//!
//! # Example
//!
//! ```rust
//! use alerthub_server::broker::Broker;
//! use alerthub_server::types::Alert;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let broker = Broker::new(2);
//!
//! for n in 0..3 {
//!     let alert: Alert = serde_json::from_value(serde_json::json!({
//!         "id": format!("a{n}"), "source": "node-1", "event_type": "cpu_high",
//!         "severity": "high", "message": "CPU 95%",
//!         "timestamp": "2024-05-01T12:00:00"
//!     })).unwrap();
//!     broker.ingest(alert).await;
//! }
//!
//! let ids: Vec<String> = broker.history().await.into_iter().map(|a| a.id).collect();
//! assert_eq!(ids, vec!["a1", "a2"]);
//! # }
//! ```

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::broadcast::{AlertSink, FanoutReport, SubscriberId, SubscriberSet};
use crate::config::Config;
use crate::error::Result;
use crate::escalation::{Escalator, SmsNotifier};
use crate::history::AlertHistory;
use crate::types::Alert;

/// Acknowledgement returned by [`Broker::ingest`].
///
/// Ingestion has no failure path; the counters are informational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestAck {
    /// Subscribers that accepted the alert.
    pub delivered: usize,

    /// Subscribers removed because their push failed.
    pub dropped: usize,

    /// Whether an old alert was evicted to make room.
    pub evicted: bool,
}

/// Central alert hub owning history, subscribers and escalation.
#[derive(Debug)]
pub struct Broker {
    history: Mutex<AlertHistory>,
    subscribers: SubscriberSet,
    escalator: Escalator,
}

impl Broker {
    /// Creates a broker with the given history capacity and no escalation.
    ///
    /// # Panics
    ///
    /// Panics if `max_alerts` is 0.
    #[must_use]
    pub fn new(max_alerts: usize) -> Self {
        Self::with_escalator(max_alerts, Escalator::disabled())
    }

    /// Creates a broker with a custom escalator.
    ///
    /// # Panics
    ///
    /// Panics if `max_alerts` is 0.
    #[must_use]
    pub fn with_escalator(max_alerts: usize, escalator: Escalator) -> Self {
        Self {
            history: Mutex::new(AlertHistory::new(max_alerts)),
            subscribers: SubscriberSet::new(),
            escalator,
        }
    }

    /// Builds a broker from server configuration.
    ///
    /// Enables SMS escalation when the config carries Twilio credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the SMS client
    /// cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let notifier = config.sms.clone().map(SmsNotifier::new).transpose()?;
        let escalator = Escalator::new(notifier);

        info!(
            max_alerts = config.max_alerts,
            escalation_enabled = escalator.is_enabled(),
            "Broker initialized"
        );

        Ok(Self::with_escalator(config.max_alerts, escalator))
    }

    /// Accepts one alert: stores it, fans it out, and triggers escalation.
    ///
    /// Returns once history is updated and fan-out has been attempted for
    /// every subscriber live at that moment. Escalation runs in the
    /// background and cannot affect the returned acknowledgement.
    pub async fn ingest(&self, alert: Alert) -> IngestAck {
        let (evicted, report) = {
            let mut history = self.history.lock().await;
            let evicted = history.push(alert.clone()).is_some();
            let report: FanoutReport = self.subscribers.fan_out(&alert);
            (evicted, report)
        };

        // Dropping the handle detaches the task.
        let _ = self.escalator.dispatch(alert.summary());

        debug!(
            event_id = %alert.id,
            event_type = %alert.event_type,
            source = %alert.source,
            delivered = report.delivered,
            dropped = report.dropped.len(),
            evicted,
            "Alert ingested"
        );

        IngestAck {
            delivered: report.delivered,
            dropped: report.dropped.len(),
            evicted,
        }
    }

    /// Returns the current history, oldest first.
    pub async fn history(&self) -> Vec<Alert> {
        self.history.lock().await.snapshot()
    }

    /// Returns the number of alerts currently retained.
    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }

    /// Registers a live subscriber.
    pub fn subscribe(&self, sink: impl AlertSink + 'static) -> SubscriberId {
        self.subscribers.subscribe(sink)
    }

    /// Removes a subscriber. Idempotent.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns `true` if the subscriber is still live.
    #[must_use]
    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.subscribers.contains(id)
    }

    #[must_use]
    pub fn escalation_enabled(&self) -> bool {
        self.escalator.is_enabled()
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(crate::history::DEFAULT_MAX_ALERTS)
    }
}
