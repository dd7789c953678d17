//! Domain models for Bidscope.
//!
//! Upstream entities decode leniently: numbers may arrive as strings,
//! nested objects may be `null` or a different shape, and anything missing
//! resolves to a default instead of an error.
//!
//! ## Submodules
//!
//! - [`thread`] - Messaging threads and messages
//! - [`project`] - Projects, budgets and bid statistics
//! - [`user`] - Clients (platform users)
//! - [`bid`] - Bids and award status
//! - [`milestone`] - Milestone payments
//! - [`record`] - The joined row ([`EnrichedRecord`])
//! - [`employee`] - Team members and shift windows

pub mod bid;
pub mod employee;
pub mod milestone;
pub mod project;
pub mod rate_limit;
pub mod record;
pub mod thread;
pub mod user;

pub use bid::{AwardStatus, Bid};
pub use employee::{Employee, Meridiem};
pub use milestone::{Milestone, MilestoneStatus, PaidMilestones};
pub use project::{BidStats, Budget, Job, Project, ProjectKind};
pub use rate_limit::RateLimitSnapshot;
pub use record::{EnrichedRecord, NOT_AVAILABLE, RecordBuilder};
pub use thread::{Message, PROJECT_CONTEXT, Thread, ThreadContext};
pub use user::{Badge, Country, EmployerReputation, Location, ReputationWindow, User, UserStatus};
