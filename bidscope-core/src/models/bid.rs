//! Bid types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::lenient;

/// Award state of a bid.
///
/// Unknown upstream values are preserved in [`AwardStatus::Other`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum AwardStatus {
    /// No award decision.
    #[default]
    None,
    /// Award offered, waiting for the bidder.
    Pending,
    /// Project awarded to the bidder.
    Awarded,
    /// Bidder accepted the award.
    Accepted,
    /// Bidder rejected the award.
    Rejected,
    /// Client revoked the award.
    Revoked,
    /// Award canceled.
    Canceled,
    /// Any other upstream value.
    Other(String),
}

impl AwardStatus {
    /// Returns true if the bid won the project.
    pub fn is_won(&self) -> bool {
        matches!(self, Self::Awarded | Self::Accepted)
    }

    /// Returns the wire name, or `None` when no decision exists.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Pending => Some("pending"),
            Self::Awarded => Some("awarded"),
            Self::Accepted => Some("accepted"),
            Self::Rejected => Some("rejected"),
            Self::Revoked => Some("revoked"),
            Self::Canceled => Some("canceled"),
            Self::Other(s) => Some(s),
        }
    }
}

impl From<Option<String>> for AwardStatus {
    fn from(value: Option<String>) -> Self {
        let Some(raw) = value else {
            return Self::None;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "" => Self::None,
            "pending" => Self::Pending,
            "awarded" => Self::Awarded,
            "accepted" => Self::Accepted,
            "rejected" => Self::Rejected,
            "revoked" => Self::Revoked,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Other(raw),
        }
    }
}

impl From<AwardStatus> for Option<String> {
    fn from(status: AwardStatus) -> Self {
        status.as_str().map(str::to_string)
    }
}

impl fmt::Display for AwardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("none"))
    }
}

/// A bid placed by the authenticated user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    /// Bid id.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub id: Option<u64>,
    /// Project the bid is on.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub project_id: Option<u64>,
    /// Owner of that project.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub project_owner_id: Option<u64>,
    /// Bidder.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub bidder_id: Option<u64>,
    /// Bid amount.
    #[serde(default, deserialize_with = "lenient::amount")]
    pub amount: f64,
    /// Submission time (epoch seconds).
    #[serde(default, deserialize_with = "lenient::opt_timestamp")]
    pub time_submitted: Option<i64>,
    /// Award state.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub award_status: AwardStatus,
    /// Award time (epoch seconds).
    #[serde(default, deserialize_with = "lenient::opt_timestamp")]
    pub time_awarded: Option<i64>,
    /// Amount paid so far.
    #[serde(default, deserialize_with = "lenient::amount")]
    pub paid_amount: f64,
}

impl Bid {
    /// Seconds between submission and award, only for awarded bids.
    pub fn bid_to_award_seconds(&self) -> Option<i64> {
        if self.award_status != AwardStatus::Awarded {
            return None;
        }
        self.time_awarded?.checked_sub(self.time_submitted?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_award_status_parsing() {
        let bid: Bid = serde_json::from_value(json!({
            "id": 1,
            "amount": "150",
            "award_status": "Awarded"
        }))
        .unwrap();
        assert_eq!(bid.award_status, AwardStatus::Awarded);
        assert!(bid.award_status.is_won());
        assert_eq!(bid.amount, 150.0);

        let bid: Bid = serde_json::from_value(json!({"award_status": "shortlisted"})).unwrap();
        assert_eq!(bid.award_status, AwardStatus::Other("shortlisted".into()));
        assert!(!bid.award_status.is_won());

        let bid: Bid = serde_json::from_value(json!({"award_status": null})).unwrap();
        assert_eq!(bid.award_status, AwardStatus::None);
    }

    #[test]
    fn test_bid_to_award_seconds() {
        let mut bid = Bid {
            time_submitted: Some(1000),
            time_awarded: Some(1500),
            award_status: AwardStatus::Awarded,
            ..Bid::default()
        };
        assert_eq!(bid.bid_to_award_seconds(), Some(500));

        bid.award_status = AwardStatus::Accepted;
        assert_eq!(bid.bid_to_award_seconds(), None);

        bid.award_status = AwardStatus::Awarded;
        bid.time_awarded = None;
        assert_eq!(bid.bid_to_award_seconds(), None);
    }

    #[test]
    fn test_award_status_serializes_as_string() {
        assert_eq!(serde_json::to_value(AwardStatus::Accepted).unwrap(), json!("accepted"));
        assert_eq!(serde_json::to_value(AwardStatus::None).unwrap(), json!(null));
    }
}
