//! Fetch error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// API Error
// ============================================================================

/// Machine-readable classification of an [`ApiError`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ApiErrorCode {
    /// HTTP 429.
    RateLimited,
    /// The request never produced a response.
    NetworkError,
    /// A 2xx response whose body could not be decoded.
    InvalidResponse,
    /// Error code reported by the upstream in the response body.
    Upstream(String),
    /// Non-2xx status without an upstream error code.
    Http(u16),
}

impl ApiErrorCode {
    /// Returns the wire form, e.g. `RATE_LIMITED` or `HTTP_404`.
    pub fn as_string(&self) -> String {
        match self {
            Self::RateLimited => "RATE_LIMITED".to_string(),
            Self::NetworkError => "NETWORK_ERROR".to_string(),
            Self::InvalidResponse => "INVALID_RESPONSE".to_string(),
            Self::Upstream(code) => code.clone(),
            Self::Http(status) => format!("HTTP_{status}"),
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<ApiErrorCode> for String {
    fn from(code: ApiErrorCode) -> Self {
        code.as_string()
    }
}

impl From<String> for ApiErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "RATE_LIMITED" => Self::RateLimited,
            "NETWORK_ERROR" => Self::NetworkError,
            "INVALID_RESPONSE" => Self::InvalidResponse,
            other => other
                .strip_prefix("HTTP_")
                .and_then(|s| s.parse().ok())
                .map_or_else(|| Self::Upstream(code.clone()), Self::Http),
        }
    }
}

/// A failed API call, as reported by the HTTP adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} ({code})")]
pub struct ApiError {
    /// Best available human-readable message.
    pub message: String,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Classification.
    pub code: ApiErrorCode,
    /// Upstream request id, when reported.
    pub request_id: Option<String>,
}

impl ApiError {
    /// Creates an error with no status or request id.
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code,
            request_id: None,
        }
    }

    /// Error for HTTP 429.
    pub fn rate_limited() -> Self {
        Self {
            status: Some(429),
            ..Self::new(ApiErrorCode::RateLimited, "Rate limit exceeded")
        }
    }

    /// Error for a request that produced no response.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NetworkError, message)
    }

    /// Returns true for HTTP 429.
    pub fn is_rate_limited(&self) -> bool {
        self.code == ApiErrorCode::RateLimited || self.status == Some(429)
    }
}

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The response decoded but did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The project lookup came back empty or failed.
    #[error("Project not found. ({reason})")]
    ProjectNotFound {
        /// Project that was looked up.
        project_id: u64,
        /// Why the lookup failed.
        reason: String,
    },

    /// The project owner lookup came back empty or failed.
    #[error("Client not found. ({reason})")]
    ClientNotFound {
        /// Owner id, if the project named one.
        user_id: Option<u64>,
        /// Why the lookup failed.
        reason: String,
    },

    /// Thread creation was rejected.
    #[error("Cannot create thread. ({0})")]
    CannotCreateThread(String),

    /// Message sending was rejected.
    #[error("Cannot send message. ({0})")]
    CannotSendMessage(String),

    /// No credential configured.
    #[error("No API token configured")]
    MissingCredential,

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] bidscope_core::CoreError),
}

impl FetchError {
    /// Returns the structured API error, if this wraps one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if the failure was a rate limit.
    pub fn is_rate_limited(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_rate_limited)
    }
}
