// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # Bidscope Fetch
//!
//! Talks to the freelancing-platform API and turns its resources into
//! enriched rows.
//!
//! ## Layers
//!
//! Leaves first:
//!
//! - [`client`] - HTTP adapter: credential header, uniform responses,
//!   rate-limit headers ([`HttpClient`], [`ApiTransport`])
//! - [`limiter`] - FIFO cap on concurrent requests ([`ConcurrencyLimiter`])
//! - [`retry`] - Exponential backoff with a fixed rate-limit delay
//!   ([`RetryStrategy`])
//! - [`context`] - Everything a fetcher needs ([`FetchContext`])
//! - [`resources`] - One async function per upstream resource
//! - [`pipeline`] - Per-thread orchestration and merge ([`Enricher`])
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use bidscope_fetch::{Credential, EnrichRequest, Enricher, FetchContext, HttpClient};
//!
//! let client = HttpClient::new("https://www.freelancer.com/api", &Credential::new(token))?;
//! let ctx = FetchContext::new(Arc::new(client));
//!
//! let outcome = Enricher::new(&ctx)
//!     .enrich_threads(&|percent, message| println!("{percent}% {message}"), &EnrichRequest::default())
//!     .await?;
//! ```

// Core modules
pub mod client;
pub mod context;
pub mod error;
pub mod limiter;
pub mod pipeline;
pub mod resources;
pub mod retry;

// Re-export key types at crate root

// Errors
pub use error::{ApiError, ApiErrorCode, FetchError};

// HTTP adapter
pub use client::{
    ApiRequest, ApiResponse, ApiTransport, Credential, DEFAULT_CREDENTIAL_HEADER, HttpClient,
    HttpClientBuilder, Method,
};

// Limiting & retry
pub use limiter::{ConcurrencyLimiter, DEFAULT_MAX_CONCURRENT};
pub use retry::{RetryStrategy, RetryableError, retry};

// Context
pub use context::{
    DispatchStrategy, FetchContext, FetchContextBuilder, FetchSettings, IdentityCache,
    RateLimitTracker,
};

// Fetchers & pipeline
pub use pipeline::{EnrichOutcome, EnrichRequest, Enricher, LISTED_PERCENT};
pub use resources::{ClientInfo, ThreadQuery, ThreadsPage};
