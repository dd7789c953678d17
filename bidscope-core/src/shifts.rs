//! Bucketing rows by employee shift.

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;

use crate::models::{EnrichedRecord, Employee};

/// Name of the bucket for rows no shift covers.
pub const UNASSIGNED: &str = "Unassigned";

/// Rows that fall inside one employee's shift.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftBucket<'a> {
    /// The employee, or `None` for the unassigned bucket.
    pub employee: Option<&'a Employee>,
    /// Rows in the bucket, in input order.
    pub records: Vec<&'a EnrichedRecord>,
}

impl ShiftBucket<'_> {
    /// Bucket label.
    pub fn label(&self) -> &str {
        self.employee.map_or(UNASSIGNED, |e| e.name.as_str())
    }

    /// Number of awarded rows.
    pub fn awarded_count(&self) -> usize {
        self.records.iter().filter(|r| r.awarded).count()
    }

    /// Sum of paid milestones over the bucket.
    pub fn total_paid(&self) -> f64 {
        self.records
            .iter()
            .map(|r| r.total_paid_milestones)
            .fold(0.0, |total, paid| total + paid)
    }

    /// Share of awarded rows, or `None` for an empty bucket.
    #[allow(clippy::cast_precision_loss)]
    pub fn win_rate(&self) -> Option<f64> {
        if self.records.is_empty() {
            None
        } else {
            Some(self.awarded_count() as f64 / self.records.len() as f64)
        }
    }
}

/// UTC hour of the row's activity timestamp.
pub fn activity_hour(record: &EnrichedRecord) -> Option<u8> {
    let timestamp = record.activity_timestamp()?;
    let hour = DateTime::<Utc>::from_timestamp(timestamp, 0)?.hour();
    u8::try_from(hour).ok()
}

/// Groups rows by the employees whose shift covers their activity hour.
///
/// Returns one bucket per employee, in employee order, followed by the
/// unassigned bucket. A row covered by overlapping shifts appears in each
/// of them; rows without a timestamp are unassigned.
pub fn bucket_by_shift<'a>(
    records: &'a [EnrichedRecord],
    employees: &'a [Employee],
) -> Vec<ShiftBucket<'a>> {
    let mut buckets: Vec<ShiftBucket<'a>> = employees
        .iter()
        .map(|e| ShiftBucket {
            employee: Some(e),
            records: Vec::new(),
        })
        .collect();
    let mut unassigned = ShiftBucket {
        employee: None,
        records: Vec::new(),
    };

    for record in records {
        let mut matched = false;
        if let Some(hour) = activity_hour(record) {
            for bucket in &mut buckets {
                if bucket.employee.is_some_and(|e| e.covers_hour(hour)) {
                    bucket.records.push(record);
                    matched = true;
                }
            }
        }
        if !matched {
            unassigned.records.push(record);
        }
    }

    buckets.push(unassigned);
    buckets
}
