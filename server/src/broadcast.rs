//! Live fan-out of alerts to connected subscribers.
//!
//! This module owns the set of live subscribers and the fan-out pass that
//! pushes every accepted alert to each of them.
//!
//! # Architecture
//!
//! - [`AlertSink`] - A non-blocking push target for one subscriber
//! - [`ChannelSink`] - The sink used by WebSocket connections: serializes the
//!   alert and enqueues it on a bounded per-connection queue
//! - [`SubscriberSet`] - The registry of live sinks plus the fan-out pass
//!
//! # Subscriber Lifecycle
//!
//! A subscriber becomes live when [`SubscriberSet::subscribe`] returns. It
//! leaves the set exactly once, either through [`SubscriberSet::unsubscribe`]
//! (client closed the connection) or because a push to it failed during
//! [`SubscriberSet::fan_out`]. Both paths are idempotent, so a connection
//! that is dropped by a fan-out pass and then closes normally is harmless.
//!
//! # Example
//!
//! ```rust
//! use alerthub_server::broadcast::{ChannelSink, SubscriberSet};
//! use tokio::sync::mpsc;
//!
//! let subscribers = SubscriberSet::new();
//!
//! let (tx, mut rx) = mpsc::channel(16);
//! let id = subscribers.subscribe(ChannelSink::new(tx));
//! assert_eq!(subscribers.len(), 1);
//!
//! subscribers.unsubscribe(id);
//! subscribers.unsubscribe(id); // no-op
//! assert!(subscribers.is_empty());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace, warn};

use crate::types::Alert;

/// Default capacity of the outbound queue for each WebSocket subscriber.
///
/// A subscriber whose queue is full when an alert is pushed is considered
/// too slow and is dropped.
pub const DEFAULT_SUBSCRIBER_QUEUE: usize = 64;

/// Opaque identifier of a live subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Reasons a push to a single subscriber can fail.
#[derive(Debug, Error)]
pub enum PushError {
    /// The subscriber's connection is gone.
    #[error("subscriber connection closed")]
    Closed,

    /// The subscriber is not draining its queue fast enough.
    #[error("subscriber queue full")]
    Full,

    /// The alert could not be encoded for the wire.
    #[error("failed to serialize alert: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A push target for one subscriber.
///
/// Implementations must not block: the fan-out pass runs on the ingestion
/// path and calls `push` for every live subscriber in turn.
pub trait AlertSink: Send + Sync {
    /// Delivers one alert to this subscriber.
    ///
    /// # Errors
    ///
    /// Any error marks the subscriber as dead; it is removed from the set
    /// at the end of the current fan-out pass.
    fn push(&self, alert: &Alert) -> Result<(), PushError>;
}

/// Sink backed by a bounded channel of pre-serialized JSON frames.
///
/// The receiving half is drained by the connection's writer task. When that
/// task exits (for example after a socket write error) the channel closes and
/// the next push fails with [`PushError::Closed`].
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

impl AlertSink for ChannelSink {
    fn push(&self, alert: &Alert) -> Result<(), PushError> {
        let frame = serde_json::to_string(alert)?;
        self.tx.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => PushError::Full,
            TrySendError::Closed(_) => PushError::Closed,
        })
    }
}

/// Outcome of one fan-out pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Number of subscribers that accepted the alert.
    pub delivered: usize,

    /// Subscribers whose push failed and that were removed from the set.
    pub dropped: Vec<SubscriberId>,
}

/// Thread-safe registry of live subscribers.
///
/// Cloning is cheap and every clone shares the same set.
#[derive(Clone, Default)]
pub struct SubscriberSet {
    inner: Arc<SubscriberSetInner>,
}

#[derive(Default)]
struct SubscriberSetInner {
    sinks: RwLock<HashMap<SubscriberId, Arc<dyn AlertSink>>>,
    next_id: AtomicU64,
}

impl SubscriberSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a live subscriber and returns its identifier.
    pub fn subscribe(&self, sink: impl AlertSink + 'static) -> SubscriberId {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let count = {
            let mut sinks = self.write();
            sinks.insert(id, Arc::new(sink));
            sinks.len()
        };
        debug!(subscriber_id = %id, subscriber_count = count, "Subscriber added");
        id
    }

    /// Removes a subscriber.
    ///
    /// Returns `true` if the subscriber was live. Removing a subscriber that
    /// is already gone is a no-op and returns `false`.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.write().remove(&id).is_some();
        if removed {
            debug!(subscriber_id = %id, "Subscriber removed");
        } else {
            trace!(subscriber_id = %id, "Subscriber already removed");
        }
        removed
    }

    /// Pushes an alert to every live subscriber.
    ///
    /// Iterates a snapshot of the set taken at the start of the pass, so
    /// concurrent subscribes and unsubscribes neither block the pass nor
    /// cause double delivery. A failing subscriber does not affect delivery
    /// to the others; every failed subscriber is removed once the pass
    /// completes.
    pub fn fan_out(&self, alert: &Alert) -> FanoutReport {
        let snapshot: Vec<(SubscriberId, Arc<dyn AlertSink>)> = self
            .read()
            .iter()
            .map(|(id, sink)| (*id, Arc::clone(sink)))
            .collect();

        let mut report = FanoutReport::default();
        let mut failed = Vec::new();

        for (id, sink) in snapshot {
            match sink.push(alert) {
                Ok(()) => {
                    trace!(subscriber_id = %id, event_id = %alert.id, "Alert pushed");
                    report.delivered += 1;
                }
                Err(err) => {
                    warn!(
                        subscriber_id = %id,
                        event_id = %alert.id,
                        error = %err,
                        "Push failed, dropping subscriber"
                    );
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut sinks = self.write();
            for id in failed {
                if sinks.remove(&id).is_some() {
                    report.dropped.push(id);
                }
            }
        }

        report
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the given subscriber is still live.
    #[must_use]
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.read().contains_key(&id)
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<SubscriberId, Arc<dyn AlertSink>>> {
        self.inner
            .sinks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SubscriberId, Arc<dyn AlertSink>>> {
        self.inner
            .sinks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberSet")
            .field("subscribers", &self.len())
            .finish()
    }
}
