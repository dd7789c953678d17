//! Client (user) types.

use serde::{Deserialize, Serialize};

use crate::lenient;

/// Country of a user location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// Country name.
    #[serde(default)]
    pub name: Option<String>,
}

/// User location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// City.
    #[serde(default)]
    pub city: Option<String>,
    /// Country.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub country: Country,
}

/// Verification flags on a user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct UserStatus {
    /// Payment method verified.
    #[serde(default)]
    pub payment_verified: bool,
    /// Email verified.
    #[serde(default)]
    pub email_verified: bool,
    /// Identity verified.
    #[serde(default)]
    pub identity_verified: bool,
    /// Phone verified.
    #[serde(default)]
    pub phone_verified: bool,
    /// Deposit made.
    #[serde(default)]
    pub deposit_made: bool,
    /// Profile complete.
    #[serde(default)]
    pub profile_complete: bool,
}

/// Reputation figures over one time window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReputationWindow {
    /// Overall rating (0-5).
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub overall: Option<f64>,
    /// Number of reviews.
    #[serde(default, deserialize_with = "lenient::opt_count")]
    pub reviews: Option<u64>,
}

/// Employer reputation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployerReputation {
    /// Lifetime reputation.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub entire_history: ReputationWindow,
}

/// A badge shown on a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    /// Badge name.
    #[serde(default)]
    pub name: String,
}

/// A platform user; the owner of a project is the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub id: Option<u64>,
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name.
    #[serde(default)]
    pub public_name: Option<String>,
    /// Location.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub location: Location,
    /// Reputation as an employer.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub employer_reputation: EmployerReputation,
    /// Verification flags.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub status: UserStatus,
    /// Registration time (epoch seconds).
    #[serde(default, deserialize_with = "lenient::opt_timestamp")]
    pub registration_date: Option<i64>,
    /// Badges.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub badges: Vec<Badge>,
    /// Primary language code.
    #[serde(default)]
    pub primary_language: Option<String>,
    /// Company name.
    #[serde(default)]
    pub company: Option<String>,
}

impl User {
    /// Returns badge names.
    pub fn badge_names(&self) -> Vec<String> {
        self.badges
            .iter()
            .filter(|b| !b.name.is_empty())
            .map(|b| b.name.clone())
            .collect()
    }
}
