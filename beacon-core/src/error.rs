//! Error types for beacon-core

use thiserror::Error;

/// Result alias used throughout beacon-core
pub type Result<T> = std::result::Result<T, BeaconError>;

/// Top-level error type for beacon-core
#[derive(Error, Debug)]
pub enum BeaconError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid arguments for {operation}: {reason}")]
    InvalidArguments {
        operation: &'static str,
        reason: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),
}

impl BeaconError {
    pub(crate) fn invalid_arguments(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            operation,
            reason: reason.into(),
        }
    }
}

/// Errors raised while talking to the collector
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid collector URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Delivery refused: {0}")]
    Refused(String),
}

/// Errors from cookie jar persistence
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode cookie jar: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Cookie jar is corrupt: {0}")]
    Corrupt(String),
}
