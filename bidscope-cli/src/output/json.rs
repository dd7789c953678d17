//! JSON output formatting.

use anyhow::Result;
use bidscope_core::{EnrichedRecord, RateLimitSnapshot, ShiftBucket};
use bidscope_store::DatasetMeta;
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for an enrichment or transform run.
#[derive(Debug, Serialize)]
pub struct RunOutput<'a> {
    pub threads: &'a [EnrichedRecord],
    pub failures: usize,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limits: Option<&'a RateLimitSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<&'a DatasetMeta>,
}

/// One shift bucket.
#[derive(Debug, Serialize)]
pub struct ShiftOutput {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    pub rows: usize,
    pub awarded: usize,
    pub total_paid: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win_rate: Option<f64>,
    pub thread_ids: Vec<u64>,
}

impl From<&ShiftBucket<'_>> for ShiftOutput {
    fn from(bucket: &ShiftBucket<'_>) -> Self {
        Self {
            label: bucket.label().to_string(),
            employee_id: bucket.employee.map(|e| e.id),
            window: bucket.employee.map(bidscope_core::Employee::window_label),
            rows: bucket.records.len(),
            awarded: bucket.awarded_count(),
            total_paid: bucket.total_paid(),
            win_rate: bucket.win_rate(),
            thread_ids: bucket.records.iter().filter_map(|r| r.thread_id).collect(),
        }
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats shift buckets.
    pub fn format_shifts(&self, buckets: &[ShiftBucket<'_>]) -> Result<String> {
        let outputs: Vec<ShiftOutput> = buckets.iter().map(ShiftOutput::from).collect();
        self.format(&outputs)
    }
}
