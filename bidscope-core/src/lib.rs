// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Bidscope Core
//!
//! Domain types and pure logic for Bidscope.
//!
//! This crate has no I/O. It provides:
//!
//! - Domain models decoded leniently from the platform API
//! - The joined row type, [`EnrichedRecord`], and its builder
//! - The bulk transform layer ([`transform_to_rows`])
//! - A weighted progress tracker
//! - Shift bucketing for employees
//!
//! ## Key Types
//!
//! ### Upstream Entities
//! - [`Thread`] / [`Message`] - Messaging threads
//! - [`Project`] - Projects, with budget and bid statistics
//! - [`User`] - Clients
//! - [`Bid`] / [`AwardStatus`] - Bids placed by the authenticated user
//! - [`Milestone`] / [`PaidMilestones`] - Milestone payments
//! - [`RateLimitSnapshot`] - Rate-limit headers from the last response
//!
//! ### Output
//! - [`EnrichedRecord`] - One joined row
//! - [`RecordBuilder`] - Assembles a row from whatever was found
//! - [`BulkCollections`] - Input to [`transform_to_rows`]
//!
//! ### Bookkeeping
//! - [`ProgressTracker`] - Weighted category progress and ETA
//! - [`Employee`] / [`ShiftBucket`] - Shift windows and bucketing

pub mod error;
pub mod lenient;
pub mod models;
pub mod progress;
pub mod shifts;
pub mod transform;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Entities
    AwardStatus,
    Badge,
    Bid,
    BidStats,
    Budget,
    Country,
    EmployerReputation,
    Job,
    Location,
    Message,
    Milestone,
    MilestoneStatus,
    PROJECT_CONTEXT,
    PaidMilestones,
    Project,
    ProjectKind,
    RateLimitSnapshot,
    ReputationWindow,
    Thread,
    ThreadContext,
    User,
    UserStatus,
    // Output
    EnrichedRecord,
    NOT_AVAILABLE,
    RecordBuilder,
    // Shifts
    Employee,
    Meridiem,
};

pub use progress::{CategoryState, CategoryStatus, DEFAULT_CATEGORIES, ProgressTracker};
pub use shifts::{ShiftBucket, UNASSIGNED, bucket_by_shift};
pub use transform::{BulkCollections, transform_to_rows};
