//! The denormalized row produced by enrichment and by the transform layer.

use serde::{Deserialize, Serialize};

use super::{Bid, Milestone, Project, ProjectKind, Thread, User, milestone};

/// Sentinel for missing text fields.
pub const NOT_AVAILABLE: &str = "N/A";

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

/// One row per thread or bid, joining project, client, bid and milestones.
///
/// Every field is always serialized. Missing data resolves to a sentinel:
/// `"N/A"` for text, `null` for optional figures, `0`, `false` or an empty
/// list otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct EnrichedRecord {
    // Keys
    /// Thread id, when the row came from a thread.
    pub thread_id: Option<u64>,
    /// Bid id.
    pub bid_id: Option<u64>,
    /// Project id.
    pub project_id: Option<u64>,

    // Project
    /// Project title.
    pub project_title: String,
    /// `fixed`, `hourly` or `N/A`.
    pub project_type: String,
    /// Project submission time.
    pub project_submitted_at: Option<i64>,
    /// Budget lower bound.
    pub budget_minimum: Option<f64>,
    /// Budget upper bound.
    pub budget_maximum: Option<f64>,
    /// Number of bids on the project.
    pub bid_count: u64,
    /// Average bid on the project.
    pub average_bid: Option<f64>,
    /// Skill tags.
    pub jobs: Vec<String>,

    // Client
    /// Client user id.
    pub client_id: Option<u64>,
    /// Client login name.
    pub client_username: String,
    /// Client display name.
    pub client_public_name: String,
    /// Client city.
    pub client_city: String,
    /// Client country.
    pub client_country: String,
    /// Client employer rating.
    pub client_reputation: Option<f64>,
    /// Client review count.
    pub client_reviews: u64,
    /// Payment method verified.
    pub payment_verified: bool,
    /// Email verified.
    pub email_verified: bool,
    /// Identity verified.
    pub identity_verified: bool,
    /// Phone verified.
    pub phone_verified: bool,
    /// Deposit made.
    pub deposit_made: bool,
    /// Profile complete.
    pub profile_complete: bool,
    /// Client registration time.
    pub client_registered_at: Option<i64>,
    /// Client badges.
    pub client_badges: Vec<String>,
    /// Client language.
    pub client_language: String,
    /// Client company.
    pub client_company: String,

    // Bid
    /// Bid amount.
    pub bid_amount: f64,
    /// Bid submission time.
    pub bid_submitted_at: Option<i64>,
    /// Award status text.
    pub award_status: String,
    /// True when the bid was awarded or accepted.
    pub awarded: bool,
    /// Award status of a bid that did not win, else `N/A`.
    pub other_status: String,
    /// Award time.
    pub time_awarded: Option<i64>,
    /// Amount paid on the bid.
    pub paid_amount: f64,

    // Thread
    /// Thread creation time.
    pub thread_created_at: Option<i64>,
    /// Earliest message in the thread.
    pub first_message_at: Option<i64>,

    // Milestones
    /// Number of milestones considered.
    pub milestone_count: usize,
    /// Sum of cleared and released milestones.
    pub total_paid_milestones: f64,
    /// Sum of all milestones considered.
    pub total_milestone_amount: f64,
    /// The milestones themselves.
    pub milestones: Vec<Milestone>,

    // Derived
    /// Seconds from bid submission to the first reply.
    pub response_time_seconds: Option<i64>,
    /// Bid amount over the project's average bid, two decimals.
    pub price_competitiveness: Option<String>,
    /// Seconds from bid submission to award.
    pub bid_to_award_time_seconds: Option<i64>,
    /// Seconds from project submission to bid submission.
    pub time_to_bid_seconds: Option<i64>,

    /// Notes about lookups that failed while building the row.
    pub error: Option<String>,
}

impl Default for EnrichedRecord {
    fn default() -> Self {
        Self {
            thread_id: None,
            bid_id: None,
            project_id: None,
            project_title: not_available(),
            project_type: not_available(),
            project_submitted_at: None,
            budget_minimum: None,
            budget_maximum: None,
            bid_count: 0,
            average_bid: None,
            jobs: Vec::new(),
            client_id: None,
            client_username: not_available(),
            client_public_name: not_available(),
            client_city: not_available(),
            client_country: not_available(),
            client_reputation: None,
            client_reviews: 0,
            payment_verified: false,
            email_verified: false,
            identity_verified: false,
            phone_verified: false,
            deposit_made: false,
            profile_complete: false,
            client_registered_at: None,
            client_badges: Vec::new(),
            client_language: not_available(),
            client_company: not_available(),
            bid_amount: 0.0,
            bid_submitted_at: None,
            award_status: not_available(),
            awarded: false,
            other_status: not_available(),
            time_awarded: None,
            paid_amount: 0.0,
            thread_created_at: None,
            first_message_at: None,
            milestone_count: 0,
            total_paid_milestones: 0.0,
            total_milestone_amount: 0.0,
            milestones: Vec::new(),
            response_time_seconds: None,
            price_competitiveness: None,
            bid_to_award_time_seconds: None,
            time_to_bid_seconds: None,
            error: None,
        }
    }
}

impl EnrichedRecord {
    /// Timestamp used to place the row in a shift: bid submission, else
    /// project submission.
    pub fn activity_timestamp(&self) -> Option<i64> {
        self.bid_submitted_at.or(self.project_submitted_at)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles an [`EnrichedRecord`] from whichever sources were found.
#[derive(Debug, Default)]
pub struct RecordBuilder<'a> {
    thread: Option<&'a Thread>,
    project: Option<&'a Project>,
    client: Option<&'a User>,
    bid: Option<&'a Bid>,
    milestones: Vec<&'a Milestone>,
    first_message_at: Option<i64>,
    errors: Vec<String>,
}

impl<'a> RecordBuilder<'a> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the thread.
    #[must_use]
    pub fn thread(mut self, thread: Option<&'a Thread>) -> Self {
        self.thread = thread;
        self
    }

    /// Sets the project.
    #[must_use]
    pub fn project(mut self, project: Option<&'a Project>) -> Self {
        self.project = project;
        self
    }

    /// Sets the client.
    #[must_use]
    pub fn client(mut self, client: Option<&'a User>) -> Self {
        self.client = client;
        self
    }

    /// Sets the bid.
    #[must_use]
    pub fn bid(mut self, bid: Option<&'a Bid>) -> Self {
        self.bid = bid;
        self
    }

    /// Sets the milestones attached to the bid.
    #[must_use]
    pub fn milestones(mut self, milestones: impl IntoIterator<Item = &'a Milestone>) -> Self {
        self.milestones = milestones.into_iter().collect();
        self
    }

    /// Sets the time of the earliest message.
    #[must_use]
    pub fn first_message_at(mut self, time: Option<i64>) -> Self {
        self.first_message_at = time;
        self
    }

    /// Adds a note about a failed lookup.
    #[must_use]
    pub fn error(mut self, note: impl Into<String>) -> Self {
        self.errors.push(note.into());
        self
    }

    /// Builds the record.
    pub fn build(self) -> EnrichedRecord {
        let mut record = EnrichedRecord {
            first_message_at: self.first_message_at,
            ..EnrichedRecord::default()
        };

        if let Some(thread) = self.thread {
            record.thread_id = Some(thread.id);
            record.project_id = thread.project_id();
            record.thread_created_at = thread.time_created;
        }

        if let Some(project) = self.project {
            apply_project(&mut record, project);
        }

        if let Some(client) = self.client {
            apply_client(&mut record, client);
        }

        if let Some(bid) = self.bid {
            apply_bid(&mut record, bid);
        }

        record.milestone_count = self.milestones.len();
        record.total_milestone_amount = milestone::sum_amounts(self.milestones.iter().copied());
        record.total_paid_milestones =
            milestone::sum_amounts(self.milestones.iter().copied().filter(|m| m.is_paid()));
        record.milestones = self.milestones.into_iter().cloned().collect();

        derive_timings(&mut record, self.project, self.bid);

        if !self.errors.is_empty() {
            record.error = Some(self.errors.join("; "));
        }

        record
    }
}

fn apply_project(record: &mut EnrichedRecord, project: &Project) {
    record.project_id = project.id.or(record.project_id);
    if let Some(title) = &project.title {
        record.project_title.clone_from(title);
    }
    record.project_type = match project.kind {
        ProjectKind::Unknown => not_available(),
        kind => kind.as_str().to_string(),
    };
    record.project_submitted_at = project.submit_date;
    record.budget_minimum = project.budget.minimum;
    record.budget_maximum = project.budget.maximum;
    record.bid_count = project.bid_stats.bid_count.unwrap_or(0);
    record.average_bid = project.bid_stats.avg_bid;
    record.jobs = project.job_names();
}

fn apply_client(record: &mut EnrichedRecord, client: &User) {
    fn text(value: Option<&String>) -> String {
        value.map_or_else(not_available, Clone::clone)
    }

    record.client_id = client.id;
    record.client_username = text(client.username.as_ref());
    record.client_public_name = text(client.public_name.as_ref());
    record.client_city = text(client.location.city.as_ref());
    record.client_country = text(client.location.country.name.as_ref());
    record.client_reputation = client.employer_reputation.entire_history.overall;
    record.client_reviews = client.employer_reputation.entire_history.reviews.unwrap_or(0);
    record.payment_verified = client.status.payment_verified;
    record.email_verified = client.status.email_verified;
    record.identity_verified = client.status.identity_verified;
    record.phone_verified = client.status.phone_verified;
    record.deposit_made = client.status.deposit_made;
    record.profile_complete = client.status.profile_complete;
    record.client_registered_at = client.registration_date;
    record.client_badges = client.badge_names();
    record.client_language = text(client.primary_language.as_ref());
    record.client_company = text(client.company.as_ref());
}

fn apply_bid(record: &mut EnrichedRecord, bid: &Bid) {
    record.bid_id = bid.id;
    record.project_id = record.project_id.or(bid.project_id);
    record.bid_amount = bid.amount;
    record.bid_submitted_at = bid.time_submitted;
    record.award_status = bid
        .award_status
        .as_str()
        .map_or_else(not_available, str::to_string);
    record.awarded = bid.award_status.is_won();
    if !record.awarded {
        record.other_status.clone_from(&record.award_status);
    }
    record.time_awarded = bid.time_awarded;
    record.paid_amount = bid.paid_amount;
    record.bid_to_award_time_seconds = bid.bid_to_award_seconds();
}

fn derive_timings(record: &mut EnrichedRecord, project: Option<&Project>, bid: Option<&Bid>) {
    let Some(bid) = bid else {
        return;
    };
    let submitted = bid.time_submitted;

    let replied = record.first_message_at.or(record.thread_created_at);
    record.response_time_seconds = replied.zip(submitted).and_then(|(r, s)| r.checked_sub(s));

    if let Some(project) = project {
        record.time_to_bid_seconds = submitted
            .zip(project.submit_date)
            .and_then(|(s, p)| s.checked_sub(p));

        record.price_competitiveness = project
            .bid_stats
            .avg_bid
            .filter(|avg| *avg != 0.0)
            .map(|avg| format!("{:.2}", bid.amount / avg));
    }
}
