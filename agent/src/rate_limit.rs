//! Per-event-type send suppression.
//!
//! Each agent keeps the time of its last *accepted* send for every event
//! type. A new alert of the same type is suppressed until `min_interval` has
//! elapsed since then. Different event types never affect each other.
//!
//! The limiter is a plain value owned by one [`AlertSender`]; it has no
//! internal locking. Time is passed in explicitly so callers and tests
//! control the clock.
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use alerthub_agent::rate_limit::RateLimiter;
//!
//! let mut limiter = RateLimiter::new(Duration::from_secs(5));
//! let now = Instant::now();
//!
//! assert!(limiter.should_send("cpu_high", now));
//! limiter.record("cpu_high", now);
//!
//! assert!(!limiter.should_send("cpu_high", now + Duration::from_secs(2)));
//! assert!(limiter.should_send("disk_full", now + Duration::from_secs(2)));
//! assert!(limiter.should_send("cpu_high", now + Duration::from_secs(5)));
//! ```
//!
//! [`AlertSender`]: crate::sender::AlertSender

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default minimum interval between two accepted sends of one event type.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(5);

/// Tracks the last accepted send per event type.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Last accepted send per event type.
    last_accepted: HashMap<String, Instant>,

    /// Minimum spacing between accepted sends of one type. Zero disables
    /// suppression.
    min_interval: Duration,
}

impl RateLimiter {
    /// Creates a limiter with the given minimum interval and no history.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_accepted: HashMap::new(),
            min_interval,
        }
    }

    /// Returns the configured minimum interval.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Returns `true` if an alert of `event_type` may be sent at `now`.
    ///
    /// Does not change any state; call [`record`](Self::record) once the
    /// send has actually been accepted.
    #[must_use]
    pub fn should_send(&self, event_type: &str, now: Instant) -> bool {
        self.retry_after(event_type, now).is_none()
    }

    /// Records an accepted send of `event_type` at `now`.
    pub fn record(&mut self, event_type: &str, now: Instant) {
        self.last_accepted.insert(event_type.to_string(), now);
    }

    /// Remaining suppression window for `event_type` at `now`.
    ///
    /// Returns `None` when a send would be allowed.
    #[must_use]
    pub fn retry_after(&self, event_type: &str, now: Instant) -> Option<Duration> {
        let last = self.last_accepted.get(event_type)?;
        // An instant earlier than the recorded one counts as zero elapsed.
        let elapsed = now.saturating_duration_since(*last);

        if elapsed >= self.min_interval {
            None
        } else {
            Some(self.min_interval - elapsed)
        }
    }

    /// Number of event types with a recorded send.
    #[must_use]
    pub fn tracked_types(&self) -> usize {
        self.last_accepted.len()
    }

    /// Forgets every recorded send.
    pub fn reset(&mut self) {
        self.last_accepted.clear();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_SECS: Duration = Duration::from_secs(5);

    #[test]
    fn first_send_of_a_type_is_allowed() {
        let limiter = RateLimiter::new(FIVE_SECS);
        assert!(limiter.should_send("cpu_high", Instant::now()));
        assert_eq!(limiter.tracked_types(), 0);
    }

    #[test]
    fn send_within_interval_is_suppressed() {
        let mut limiter = RateLimiter::new(FIVE_SECS);
        let t0 = Instant::now();
        limiter.record("cpu_high", t0);

        assert!(!limiter.should_send("cpu_high", t0));
        assert!(!limiter.should_send("cpu_high", t0 + Duration::from_millis(4_999)));
    }

    #[test]
    fn send_at_exact_interval_is_allowed() {
        let mut limiter = RateLimiter::new(FIVE_SECS);
        let t0 = Instant::now();
        limiter.record("cpu_high", t0);

        assert!(limiter.should_send("cpu_high", t0 + FIVE_SECS));
        assert!(limiter.should_send("cpu_high", t0 + Duration::from_secs(60)));
    }

    #[test]
    fn event_types_are_independent() {
        let mut limiter = RateLimiter::new(FIVE_SECS);
        let t0 = Instant::now();
        limiter.record("cpu_high", t0);

        assert!(limiter.should_send("disk_full", t0 + Duration::from_secs(1)));
        assert!(!limiter.should_send("cpu_high", t0 + Duration::from_secs(1)));
    }

    #[test]
    fn should_send_does_not_mutate() {
        let limiter = RateLimiter::new(FIVE_SECS);
        let t0 = Instant::now();

        assert!(limiter.should_send("cpu_high", t0));
        assert!(limiter.should_send("cpu_high", t0));
        assert_eq!(limiter.tracked_types(), 0);
    }

    #[test]
    fn zero_interval_never_suppresses() {
        let mut limiter = RateLimiter::new(Duration::ZERO);
        let t0 = Instant::now();
        limiter.record("cpu_high", t0);

        assert!(limiter.should_send("cpu_high", t0));
        assert_eq!(limiter.retry_after("cpu_high", t0), None);
    }

    #[test]
    fn retry_after_reports_remaining_window() {
        let mut limiter = RateLimiter::new(FIVE_SECS);
        let t0 = Instant::now();
        limiter.record("cpu_high", t0);

        assert_eq!(
            limiter.retry_after("cpu_high", t0 + Duration::from_secs(2)),
            Some(Duration::from_secs(3))
        );
        assert_eq!(limiter.retry_after("cpu_high", t0 + FIVE_SECS), None);
        assert_eq!(limiter.retry_after("unknown", t0), None);
    }

    #[test]
    fn record_overwrites_previous_send() {
        let mut limiter = RateLimiter::new(FIVE_SECS);
        let t0 = Instant::now();
        limiter.record("cpu_high", t0);
        limiter.record("cpu_high", t0 + Duration::from_secs(10));

        assert_eq!(limiter.tracked_types(), 1);
        assert!(!limiter.should_send("cpu_high", t0 + Duration::from_secs(12)));
    }

    #[test]
    fn reset_clears_history() {
        let mut limiter = RateLimiter::default();
        let t0 = Instant::now();
        limiter.record("a", t0);
        limiter.record("b", t0);
        assert_eq!(limiter.tracked_types(), 2);

        limiter.reset();

        assert_eq!(limiter.tracked_types(), 0);
        assert!(limiter.should_send("a", t0));
    }

    #[test]
    fn default_uses_five_seconds() {
        assert_eq!(RateLimiter::default().min_interval(), DEFAULT_MIN_INTERVAL);
    }
}
