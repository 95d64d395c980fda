//! Error types for vpn-paths-agent
//!
//! This module defines the error types used throughout the application.
//! We use `thiserror` for ergonomic error definitions and `anyhow` for
//! error propagation in the binary.
//!
//! A failed VPN toggle is deliberately absent here: the external program's
//! output is returned to the caller as an `OperationOutput` instead.

use thiserror::Error;

/// Main error type for vpn-paths-agent operations
#[derive(Error, Debug)]
pub enum VpnPathsError {
    /// Input failed basic well-formedness (e.g. an empty path)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Path store could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// A toggle is already in flight
    #[error("Busy: {0}")]
    Busy(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Control API errors
    #[error("Control API error: {0}")]
    ControlApi(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias using VpnPathsError
pub type Result<T> = std::result::Result<T, VpnPathsError>;

impl From<serde_json::Error> for VpnPathsError {
    fn from(err: serde_json::Error) -> Self {
        VpnPathsError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for VpnPathsError {
    fn from(err: toml::de::Error) -> Self {
        VpnPathsError::Config(err.to_string())
    }
}
