//! Error types for stash-client.
//!
//! This module defines domain-specific error types organized by functional area.

use std::fmt;
use thiserror::Error;

/// Top-level error type encompassing all possible errors.
#[derive(Error, Debug)]
pub enum StashError {
    /// Connection construction and lifecycle errors
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Transport and protocol errors, passed through untouched
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised while building or connecting a `StashConnection`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// A required constructor argument was never supplied
    #[error("Missing required argument '{parameter}'")]
    MissingArgument { parameter: String },

    /// An argument was supplied but is unusable
    #[error("Invalid connection parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Connection string could not be parsed or lacks a required key
    #[error("{}", malformed_message(.key, .message))]
    MalformedConnectionString {
        key: Option<String>,
        message: String,
    },

    /// Cancellation was requested before or during `connect`
    #[error("Connect operation was cancelled")]
    Cancelled,
}

fn malformed_message(key: &Option<String>, message: &str) -> String {
    match key {
        Some(key) => format!("Malformed connection string, key '{}': {}", key, message),
        None => format!("Malformed connection string: {}", message),
    }
}

/// Errors related to the HTTP transport and REST protocol.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Request could not be sent or the response body could not be read
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status code
    #[error("Server returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Response body was not the expected JSON document
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// A header value could not be encoded
    #[error("Invalid header value for '{0}'")]
    InvalidHeader(String),
}

/// Coarse error categories for callers that branch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or unusable constructor argument
    InvalidArgument,
    /// Unparsable or incomplete connection string
    MalformedInput,
    /// Operation cancelled by the caller
    Cancelled,
    /// Network, TLS or HTTP failure
    Transport,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            ErrorKind::MalformedInput => write!(f, "MALFORMED_INPUT"),
            ErrorKind::Cancelled => write!(f, "CANCELLED"),
            ErrorKind::Transport => write!(f, "TRANSPORT"),
        }
    }
}

impl StashError {
    /// Map to an error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StashError::Connection(e) => e.kind(),
            StashError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Whether this error reports a cancelled operation.
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

impl ConnectionError {
    /// Map to an error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectionError::MissingArgument { .. } | ConnectionError::InvalidParameter { .. } => {
                ErrorKind::InvalidArgument
            }
            ConnectionError::MalformedConnectionString { .. } => ErrorKind::MalformedInput,
            ConnectionError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn missing(parameter: &str) -> Self {
        ConnectionError::MissingArgument {
            parameter: parameter.to_string(),
        }
    }

    pub(crate) fn missing_key(key: &str) -> Self {
        ConnectionError::MalformedConnectionString {
            key: Some(key.to_string()),
            message: "required key not found".to_string(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        ConnectionError::MalformedConnectionString {
            key: None,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Deserialization(err.to_string())
    }
}
