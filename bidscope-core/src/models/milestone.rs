//! Milestone payment types.

use serde::{Deserialize, Serialize};

use crate::lenient;

/// Payment state of a milestone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum MilestoneStatus {
    /// Funds cleared to the freelancer.
    Cleared,
    /// Funds released by the client.
    Released,
    /// Created but not paid.
    #[default]
    Pending,
    /// Any other upstream value.
    Other(String),
}

impl MilestoneStatus {
    /// Returns the wire name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cleared => "cleared",
            Self::Released => "released",
            Self::Pending => "pending",
            Self::Other(s) => s,
        }
    }
}

impl From<Option<String>> for MilestoneStatus {
    fn from(value: Option<String>) -> Self {
        let Some(raw) = value else {
            return Self::Pending;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "cleared" => Self::Cleared,
            "released" => Self::Released,
            "" | "pending" => Self::Pending,
            _ => Self::Other(raw),
        }
    }
}

impl From<MilestoneStatus> for Option<String> {
    fn from(status: MilestoneStatus) -> Self {
        Some(status.as_str().to_string())
    }
}

/// A milestone payment attached to a bid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Milestone id.
    #[serde(default, alias = "transaction_id", deserialize_with = "lenient::opt_id")]
    pub id: Option<u64>,
    /// Bid the milestone pays for.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub bid_id: Option<u64>,
    /// Project the milestone belongs to.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub project_id: Option<u64>,
    /// Amount; unparseable values count as zero.
    #[serde(default, deserialize_with = "lenient::amount")]
    pub amount: f64,
    /// Payment state.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub status: MilestoneStatus,
    /// Creation time (epoch seconds).
    #[serde(default, deserialize_with = "lenient::opt_timestamp")]
    pub time_created: Option<i64>,
    /// Free-text description.
    #[serde(default)]
    pub reason: Option<String>,
}

impl Milestone {
    /// Returns true for cleared or released milestones.
    pub fn is_paid(&self) -> bool {
        matches!(self.status, MilestoneStatus::Cleared | MilestoneStatus::Released)
    }
}

/// Paid milestones for one project and their total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaidMilestones {
    /// Paid milestones in upstream order.
    pub milestones: Vec<Milestone>,
    /// Sum of their amounts.
    pub total_paid: f64,
}

impl PaidMilestones {
    /// Keeps the paid milestones and sums their amounts.
    pub fn from_milestones(milestones: impl IntoIterator<Item = Milestone>) -> Self {
        let milestones: Vec<Milestone> = milestones.into_iter().filter(Milestone::is_paid).collect();
        let total_paid = sum_amounts(&milestones);
        Self {
            milestones,
            total_paid,
        }
    }
}

/// Sums milestone amounts, skipping non-finite values.
pub fn sum_amounts<'a>(milestones: impl IntoIterator<Item = &'a Milestone>) -> f64 {
    milestones
        .into_iter()
        .map(|m| m.amount)
        .filter(|a| a.is_finite())
        .fold(0.0, |total, amount| total + amount)
}
