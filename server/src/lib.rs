//! AlertHub Server - Real-time alert hub.
//!
//! This crate provides the server component of AlertHub, responsible for:
//! - Receiving alerts from agents over HTTP
//! - Keeping a bounded, ordered history of recent alerts
//! - Pushing every accepted alert to live WebSocket subscribers
//! - Escalating alerts by SMS when a provider is configured
//!
//! # Architecture
//!
//! The [`broker::Broker`] sits between agents (alert producers) and
//! subscribers (dashboards). History lives in memory only; a restart starts
//! from an empty history.

pub mod broadcast;
pub mod broker;
pub mod config;
pub mod error;
pub mod escalation;
pub mod history;
pub mod routes;
pub mod types;
