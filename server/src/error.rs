//! Error types for the Chatter server.
//!
//! # Error Types
//!
//! - [`ConfigError`] - Configuration errors, re-exported from [`crate::config`]
//! - [`ServerError`] - Top-level server errors encompassing all failure modes
//!
//! [`ServerError`] implements axum's `IntoResponse`, so handlers can return
//! it directly: request validation failures become `400` with a JSON body of
//! the form `{"error":"..."}`, everything else becomes `500`.

use std::error::Error;
use std::fmt;
use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

pub use crate::config::ConfigError;

/// Top-level error type for the Chatter server.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error during server initialization.
    Config(ConfigError),

    /// Request validation failure.
    ///
    /// Returned when a speak request is not JSON or carries no usable text.
    Validation(String),

    /// The listening socket could not be bound.
    Bind {
        /// Address that was requested.
        address: String,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Unexpected I/O failure while serving.
    Io(io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Validation(msg) => f.write_str(msg),
            Self::Bind { address, source } => {
                write!(f, "failed to bind to {address}: {source}")
            }
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Bind { source, .. } => Some(source),
            Self::Io(err) => Some(err),
            Self::Validation(_) => None,
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<io::Error> for ServerError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl ServerError {
    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a new bind error.
    pub fn bind(address: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }

    /// Returns `true` if this error was caused by the client.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// HTTP status this error maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if self.is_client_error() {
            self.to_string()
        } else {
            error!(error = %self, "Request failed");
            "internal server error".to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// A specialized `Result` type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
