//! AlertHub Agent - Rate-limited alert producer.
//!
//! This crate provides the producer side of AlertHub:
//! - Building alerts with a fresh id and UTC timestamp
//! - Suppressing repeats of the same event type within a minimum interval
//! - Posting alerts to the AlertHub server
//!
//! The [`sender::AlertSender`] never returns an error; every call reports a
//! [`sender::SendOutcome`].

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod sender;
pub mod types;
