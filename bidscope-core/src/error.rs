//! Core error types for `Bidscope`.

use thiserror::Error;

/// Core error type for `Bidscope` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data, usually from a caller-supplied value.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A progress category that the tracker was not built with.
    #[error("Unknown progress category: {0}")]
    UnknownCategory(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
