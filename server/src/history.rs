//! Bounded, insertion-ordered alert retention.
//!
//! [`AlertHistory`] keeps the most recent alerts in arrival order. When an
//! insertion would exceed the configured capacity, exactly one entry (the
//! oldest) is evicted.
//!
//! The history is not synchronized on its own; the [`Broker`](crate::broker::Broker)
//! owns it behind a mutex so that append and evict happen atomically with
//! respect to concurrent ingestions.

use std::collections::VecDeque;

use tracing::trace;

use crate::types::Alert;

/// Default number of alerts retained by the broker.
pub const DEFAULT_MAX_ALERTS: usize = 200;

/// FIFO buffer of the most recent alerts.
#[derive(Debug, Clone)]
pub struct AlertHistory {
    alerts: VecDeque<Alert>,
    capacity: usize,
}

impl AlertHistory {
    /// Creates an empty history holding at most `capacity` alerts.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0. Configuration loading rejects a zero
    /// capacity before a history is ever built.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be at least 1");
        // Reserve lazily past the default; capacity comes from configuration.
        Self {
            alerts: VecDeque::with_capacity(capacity.min(DEFAULT_MAX_ALERTS)),
            capacity,
        }
    }

    /// Appends an alert, evicting the oldest entry if the capacity is exceeded.
    ///
    /// Returns the evicted alert, if any.
    pub fn push(&mut self, alert: Alert) -> Option<Alert> {
        self.alerts.push_back(alert);

        if self.alerts.len() > self.capacity {
            let evicted = self.alerts.pop_front();
            if let Some(ref old) = evicted {
                trace!(event_id = %old.id, "Evicted oldest alert from history");
            }
            evicted
        } else {
            None
        }
    }

    /// Returns a copy of all retained alerts, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Alert> {
        self.alerts.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for AlertHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ALERTS)
    }
}
