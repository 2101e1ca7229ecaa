//! Error types for the AlertHub server.
//!
//! This module defines the top-level error used at the server's edges:
//! startup (building the broker from configuration) and the HTTP boundary
//! (rejecting malformed requests).
//!
//! Nothing on the ingestion, fan-out or escalation path produces a
//! [`ServerError`]; failures there are absorbed and logged where they occur.
//!
//! # Example
//!
//! ```rust
//! use alerthub_server::error::ServerError;
//!
//! let err = ServerError::validation("missing field `event_type`");
//! assert!(err.is_client_error());
//! ```

use std::error::Error;
use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::config::ConfigError;
use crate::escalation::EscalationError;

/// Top-level error type for the AlertHub server.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error during server initialization.
    Config(ConfigError),

    /// Escalation provider could not be set up.
    Escalation(EscalationError),

    /// Request validation failure.
    ///
    /// Returned when an incoming alert is not valid JSON, misses a required
    /// field, or has a field of the wrong type.
    Validation(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Escalation(err) => write!(f, "escalation error: {err}"),
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Escalation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<EscalationError> for ServerError {
    fn from(err: EscalationError) -> Self {
        Self::Escalation(err)
    }
}

impl ServerError {
    /// Creates a new validation error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use alerthub_server::error::ServerError;
    ///
    /// let err = ServerError::validation("missing 'event_type' field");
    /// assert!(matches!(err, ServerError::Validation(_)));
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns `true` if this error indicates a client-side problem.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns `true` if this error indicates a server-side problem.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Escalation(_))
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Escalation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code included in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid_format",
            Self::Config(_) | Self::Escalation(_) => "server_error",
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) code: Option<String>,
}

impl ErrorResponse {
    pub(crate) fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }

    pub(crate) fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal details stay in the logs.
        let message = if self.is_server_error() {
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (
            status,
            Json(ErrorResponse::new(message).with_code(self.code())),
        )
            .into_response()
    }
}

/// A specialized Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
