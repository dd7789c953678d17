//! Store error types.

use bidscope_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No dataset with this name.
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    /// No employee with this id.
    #[error("Employee not found: {0}")]
    EmployeeNotFound(u64),

    /// A dataset name that sanitizes to nothing.
    #[error("Invalid dataset name: {0:?}")]
    InvalidName(String),

    /// Employee failed validation.
    #[error("Invalid employee: {0}")]
    InvalidEmployee(String),

    /// Unknown settings key or unparsable value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Serialization(e) => Self::Serialization(e),
            CoreError::InvalidData(msg) => Self::InvalidEmployee(msg),
            other => Self::Config(other.to_string()),
        }
    }
}

impl StoreError {
    /// Returns true if the error means "nothing stored under that key".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::DatasetNotFound(_) | StoreError::EmployeeNotFound(_)
        )
    }
}
