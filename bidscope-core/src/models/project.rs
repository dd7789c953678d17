//! Project types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::lenient;

/// Project budget. Fixed projects carry min/max, some carry a single amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Lower bound.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub minimum: Option<f64>,
    /// Upper bound.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub maximum: Option<f64>,
    /// Single budget figure.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub amount: Option<f64>,
}

/// Aggregate bid statistics for a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidStats {
    /// Number of bids placed.
    #[serde(default, deserialize_with = "lenient::opt_count")]
    pub bid_count: Option<u64>,
    /// Average bid amount.
    #[serde(default, alias = "bid_avg", deserialize_with = "lenient::opt_f64")]
    pub avg_bid: Option<f64>,
}

/// A skill/category tag on a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Job name.
    #[serde(default)]
    pub name: String,
}

/// Project billing type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    /// Fixed-price project.
    Fixed,
    /// Hourly project.
    Hourly,
    /// Missing or unrecognized type.
    #[default]
    #[serde(other)]
    Unknown,
}

impl ProjectKind {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Hourly => "hourly",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A project posted on the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project id.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub id: Option<u64>,
    /// Project owner (the client).
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub owner_id: Option<u64>,
    /// Title.
    #[serde(default)]
    pub title: Option<String>,
    /// Submission time (epoch seconds).
    #[serde(default, alias = "submitdate", deserialize_with = "lenient::opt_timestamp")]
    pub submit_date: Option<i64>,
    /// Budget.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub budget: Budget,
    /// Billing type.
    #[serde(default, rename = "type", deserialize_with = "lenient::or_default")]
    pub kind: ProjectKind,
    /// Bid statistics.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub bid_stats: BidStats,
    /// Skill tags.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub jobs: Vec<Job>,
}

impl Project {
    /// Returns the skill tag names.
    pub fn job_names(&self) -> Vec<String> {
        self.jobs
            .iter()
            .filter(|j| !j.name.is_empty())
            .map(|j| j.name.clone())
            .collect()
    }
}
