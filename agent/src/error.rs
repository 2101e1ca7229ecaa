//! Error types for the AlertHub agent.
//!
//! Sending an alert never produces one of these; see
//! [`SendOutcome`](crate::sender::SendOutcome). They cover setup and CLI
//! plumbing: configuration, HTTP client construction, and JSON input.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while setting up the agent.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP client could not be created.
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
