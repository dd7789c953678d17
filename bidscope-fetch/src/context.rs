//! Fetch context shared by all resource fetchers.
//!
//! The context bundles the transport, the concurrency limiter, the retry
//! policy and the small pieces of shared state (cached identity, latest
//! rate-limit snapshot) that would otherwise live in module globals.

use std::sync::{Arc, PoisonError, RwLock};

use bidscope_core::{NOT_AVAILABLE, RateLimitSnapshot};

use crate::client::ApiTransport;
use crate::limiter::{ConcurrencyLimiter, DEFAULT_MAX_CONCURRENT};
use crate::retry::{DEFAULT_MAX_ATTEMPTS, RetryStrategy};

/// Default page size for the thread listing.
pub const DEFAULT_THREAD_PAGE_SIZE: u32 = 100;

// ============================================================================
// Dispatch Strategy
// ============================================================================

/// How the pipeline walks the thread list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStrategy {
    /// One thread at a time.
    Sequential,
    /// Up to `max_in_flight` threads at a time; every request still passes
    /// through the shared limiter.
    Concurrent {
        /// Threads enriched at once.
        max_in_flight: usize,
    },
}

impl DispatchStrategy {
    /// Threads enriched at once.
    pub fn width(&self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Concurrent { max_in_flight } => (*max_in_flight).max(1),
        }
    }
}

impl Default for DispatchStrategy {
    fn default() -> Self {
        Self::Concurrent {
            max_in_flight: DEFAULT_MAX_CONCURRENT,
        }
    }
}

// ============================================================================
// Fetch Settings
// ============================================================================

/// Settings for fetch operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// Concurrent HTTP requests.
    pub max_concurrent: usize,
    /// Attempts per GET request.
    pub max_retries: u32,
    /// Page size for the thread listing.
    pub thread_page_size: u32,
    /// Identity used when the current user cannot be resolved.
    pub fallback_user_id: Option<u64>,
    /// Thread dispatch.
    pub dispatch: DispatchStrategy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_retries: DEFAULT_MAX_ATTEMPTS,
            thread_page_size: DEFAULT_THREAD_PAGE_SIZE,
            fallback_user_id: None,
            dispatch: DispatchStrategy::default(),
        }
    }
}

// ============================================================================
// Shared State
// ============================================================================

/// Cached id of the authenticated user.
#[derive(Debug, Default)]
pub struct IdentityCache {
    user_id: RwLock<Option<u64>>,
}

impl IdentityCache {
    /// Cached id, if resolved.
    pub fn get(&self) -> Option<u64> {
        *self.user_id.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores the id.
    pub fn set(&self, user_id: u64) {
        *self.user_id.write().unwrap_or_else(PoisonError::into_inner) = Some(user_id);
    }

    /// Forgets the id so the next lookup hits the API. Idempotent.
    pub fn invalidate(&self) {
        *self.user_id.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Most recent rate-limit snapshot seen on any response.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    latest: RwLock<RateLimitSnapshot>,
}

impl RateLimitTracker {
    /// Records a snapshot. Responses without rate-limit headers keep the
    /// previous snapshot unless they were rate limited themselves.
    pub fn record(&self, snapshot: &RateLimitSnapshot) {
        let headerless =
            snapshot.limit == NOT_AVAILABLE && snapshot.remaining == NOT_AVAILABLE;
        if headerless && !snapshot.is_rate_limited {
            return;
        }
        self.latest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clone_from(snapshot);
    }

    /// Latest snapshot.
    pub fn latest(&self) -> RateLimitSnapshot {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// ============================================================================
// Fetch Context
// ============================================================================

/// Context passed to every fetcher.
pub struct FetchContext {
    /// Executes requests.
    pub transport: Arc<dyn ApiTransport>,
    /// Shared request limiter.
    pub limiter: ConcurrencyLimiter,
    /// Retry policy for GET requests.
    pub retry: RetryStrategy,
    /// Cached identity.
    pub identity: IdentityCache,
    /// Latest rate-limit snapshot.
    pub rate_limits: RateLimitTracker,
    /// Settings.
    pub settings: FetchSettings,
}

impl FetchContext {
    /// Creates a context with default settings.
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self::builder(transport).build()
    }

    /// Creates a builder for customizing the context.
    pub fn builder(transport: Arc<dyn ApiTransport>) -> FetchContextBuilder {
        FetchContextBuilder::new(transport)
    }
}

impl std::fmt::Debug for FetchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchContext")
            .field("limiter", &self.limiter)
            .field("retry", &self.retry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Fetch Context Builder
// ============================================================================

/// Builder for constructing a `FetchContext`.
pub struct FetchContextBuilder {
    transport: Arc<dyn ApiTransport>,
    retry: Option<RetryStrategy>,
    settings: FetchSettings,
}

impl FetchContextBuilder {
    /// Creates a new builder.
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            transport,
            retry: None,
            settings: FetchSettings::default(),
        }
    }

    /// Sets the fetch settings.
    #[must_use]
    pub fn settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the concurrent request limit.
    #[must_use]
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.settings.max_concurrent = max_concurrent;
        self
    }

    /// Sets the attempts per GET request.
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.settings.max_retries = max_retries;
        self
    }

    /// Sets the fallback identity.
    #[must_use]
    pub fn fallback_user_id(mut self, user_id: Option<u64>) -> Self {
        self.settings.fallback_user_id = user_id;
        self
    }

    /// Sets the dispatch strategy.
    #[must_use]
    pub fn dispatch(mut self, dispatch: DispatchStrategy) -> Self {
        self.settings.dispatch = dispatch;
        self
    }

    /// Replaces the retry policy derived from `max_retries`.
    #[must_use]
    pub fn retry(mut self, retry: RetryStrategy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Builds the fetch context.
    pub fn build(self) -> FetchContext {
        let retry = self
            .retry
            .unwrap_or_else(|| RetryStrategy::new(self.settings.max_retries));
        FetchContext {
            transport: self.transport,
            limiter: ConcurrencyLimiter::new(self.settings.max_concurrent),
            retry,
            identity: IdentityCache::default(),
            rate_limits: RateLimitTracker::default(),
            settings: self.settings,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
