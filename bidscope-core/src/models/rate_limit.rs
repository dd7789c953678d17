//! Rate-limit metadata.

use serde::{Deserialize, Serialize};

use super::record::NOT_AVAILABLE;

/// Rate-limit headers captured from one response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSnapshot {
    /// `RateLimit-Limit` header, or `N/A`.
    pub limit: String,
    /// `RateLimit-Remaining` header, or `N/A`.
    pub remaining: String,
    /// True when the response was HTTP 429.
    pub is_rate_limited: bool,
}

impl Default for RateLimitSnapshot {
    fn default() -> Self {
        Self {
            limit: NOT_AVAILABLE.to_string(),
            remaining: NOT_AVAILABLE.to_string(),
            is_rate_limited: false,
        }
    }
}

impl RateLimitSnapshot {
    /// Snapshot for a rate-limited response.
    pub fn limited(limit: Option<String>) -> Self {
        Self {
            limit: limit.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            remaining: "0".to_string(),
            is_rate_limited: true,
        }
    }
}
