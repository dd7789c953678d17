//! Enrichment pipeline.
//!
//! Lists active project threads, then for every thread fetches the project,
//! its owner, the user's bid, paid milestones and the first message date,
//! and merges them into one [`EnrichedRecord`]. Only the initial listing is
//! fatal; any other failure leaves sentinels in the affected fields and a
//! note in the record's `error`.

use std::time::{Duration, Instant};

use bidscope_core::{EnrichedRecord, RateLimitSnapshot, RecordBuilder, Thread};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::context::FetchContext;
use crate::error::FetchError;
use crate::resources::{
    ThreadQuery, fetch_active_threads, fetch_client_info, fetch_first_message_date,
    fetch_my_bid_for_project, fetch_my_user_id, fetch_paid_milestones_for_project,
};

/// Percent reported once the thread listing is in.
pub const LISTED_PERCENT: u8 = 10;

// ============================================================================
// Request / Outcome
// ============================================================================

/// What to enrich.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichRequest {
    /// Maximum number of project threads.
    pub max_threads: Option<usize>,
    /// Only threads updated at or after this time (epoch seconds).
    pub from: Option<i64>,
    /// Only threads updated at or before this time (epoch seconds).
    pub to: Option<i64>,
}

/// The result of an enrichment run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrichOutcome {
    /// One record per thread, in listing order.
    pub threads: Vec<EnrichedRecord>,
    /// Latest rate-limit snapshot.
    pub rate_limits: RateLimitSnapshot,
    /// True if the run was cancelled before every thread was enriched.
    pub cancelled: bool,
    /// Number of records that carry an error note.
    pub failures: usize,
    /// Wall-clock duration of the run.
    #[serde(skip)]
    pub duration: Duration,
}

// ============================================================================
// Progress
// ============================================================================

/// Feeds the caller's callback with a percent that never decreases and
/// reaches 100 exactly once.
struct ProgressReporter<'p, P> {
    callback: &'p P,
    last: u8,
    finished: bool,
}

impl<'p, P> ProgressReporter<'p, P>
where
    P: Fn(u8, &str),
{
    fn new(callback: &'p P) -> Self {
        Self {
            callback,
            last: 0,
            finished: false,
        }
    }

    fn report(&mut self, percent: u8, message: &str) {
        if self.finished {
            return;
        }
        self.last = percent.min(99).max(self.last);
        (self.callback)(self.last, message);
    }

    fn thread_done(&mut self, done: usize, total: usize) {
        let span = usize::from(99 - LISTED_PERCENT);
        let step = if total == 0 { span } else { span * done / total };
        let percent = usize::from(LISTED_PERCENT) + step;
        self.report(
            u8::try_from(percent).unwrap_or(99),
            &format!("Enriched {done}/{total} threads"),
        );
    }

    fn finish(&mut self, message: &str) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.last = 100;
        (self.callback)(100, message);
    }
}

// ============================================================================
// Enricher
// ============================================================================

/// Runs the enrichment pipeline over a [`FetchContext`].
#[derive(Debug, Clone, Copy)]
pub struct Enricher<'a> {
    ctx: &'a FetchContext,
}

impl<'a> Enricher<'a> {
    /// Creates an enricher.
    pub fn new(ctx: &'a FetchContext) -> Self {
        Self { ctx }
    }

    /// Enriches every matching thread.
    pub async fn enrich_threads<P>(
        &self,
        progress: &P,
        request: &EnrichRequest,
    ) -> Result<EnrichOutcome, FetchError>
    where
        P: Fn(u8, &str) + Sync,
    {
        self.enrich_threads_until(progress, request, &CancellationToken::new())
            .await
    }

    /// Enriches threads until done or until `cancel` fires.
    ///
    /// On cancellation no new thread is started, in-flight threads are
    /// dropped, and the records finished so far are returned with
    /// `cancelled` set.
    #[instrument(skip(self, progress, cancel))]
    pub async fn enrich_threads_until<P>(
        &self,
        progress: &P,
        request: &EnrichRequest,
        cancel: &CancellationToken,
    ) -> Result<EnrichOutcome, FetchError>
    where
        P: Fn(u8, &str) + Sync,
    {
        let start = Instant::now();
        let mut reporter = ProgressReporter::new(progress);
        reporter.report(0, "Fetching threads");

        let query = ThreadQuery {
            from: request.from,
            to: request.to,
            limit: request.max_threads,
        };
        let page = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                reporter.finish("Cancelled");
                return Ok(EnrichOutcome {
                    rate_limits: self.ctx.rate_limits.latest(),
                    cancelled: true,
                    duration: start.elapsed(),
                    ..EnrichOutcome::default()
                });
            }
            page = fetch_active_threads(self.ctx, &query) => page?,
        };

        let total = page.threads.len();
        info!(total, "Listed project threads");
        reporter.report(LISTED_PERCENT, &format!("Found {total} threads"));

        let user_id = self.resolve_user_id().await;
        let width = self.ctx.settings.dispatch.width();
        debug!(width, ?user_id, "Dispatching threads");

        let mut records = Vec::with_capacity(total);
        let mut failures = 0;
        let mut cancelled = false;

        let mut results = stream::iter(
            page.threads
                .iter()
                .map(|thread| self.enrich_one(thread, user_id, cancel)),
        )
        .buffered(width);

        while let Some(result) = results.next().await {
            let Some(record) = result else {
                cancelled = true;
                break;
            };
            if record.error.is_some() {
                failures += 1;
            }
            records.push(record);
            reporter.thread_done(records.len(), total);
        }
        drop(results);

        if cancelled {
            warn!(done = records.len(), total, "Enrichment cancelled");
            reporter.finish("Cancelled");
        } else {
            reporter.finish("Done");
        }

        Ok(EnrichOutcome {
            threads: records,
            rate_limits: self.ctx.rate_limits.latest(),
            cancelled,
            failures,
            duration: start.elapsed(),
        })
    }

    /// Current user id, falling back to the configured identity.
    async fn resolve_user_id(&self) -> Option<u64> {
        match fetch_my_user_id(self.ctx).await {
            Ok(user_id) => Some(user_id),
            Err(e) => {
                let fallback = self.ctx.settings.fallback_user_id;
                warn!(error = %e, ?fallback, "Could not resolve current user");
                fallback
            }
        }
    }

    async fn enrich_one(
        &self,
        thread: &Thread,
        user_id: Option<u64>,
        cancel: &CancellationToken,
    ) -> Option<EnrichedRecord> {
        if cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            record = self.enrich_thread(thread, user_id) => Some(record),
        }
    }

    /// Builds the record for one thread. Never fails.
    #[instrument(skip(self, thread), fields(thread_id = thread.id))]
    async fn enrich_thread(&self, thread: &Thread, user_id: Option<u64>) -> EnrichedRecord {
        let Some(project_id) = thread.project_id() else {
            return RecordBuilder::new()
                .thread(Some(thread))
                .error("thread has no project id")
                .build();
        };
        let ctx = self.ctx;

        let bid = async move {
            match user_id {
                Some(user_id) => fetch_my_bid_for_project(ctx, project_id, user_id).await,
                None => Err(missing_user()),
            }
        };
        let milestones = async move {
            match user_id {
                Some(user_id) => fetch_paid_milestones_for_project(ctx, project_id, user_id).await,
                None => Err(missing_user()),
            }
        };

        let (client_info, bid, milestones, first_message) = tokio::join!(
            fetch_client_info(ctx, project_id),
            bid,
            milestones,
            fetch_first_message_date(ctx, thread.id),
        );

        let mut notes = Vec::new();
        let client_info = keep(client_info, "client", &mut notes);
        let bid = keep(bid, "bid", &mut notes).flatten();
        let milestones = keep(milestones, "milestones", &mut notes).unwrap_or_default();
        let first_message = keep(first_message, "first message", &mut notes).flatten();

        let mut builder = RecordBuilder::new()
            .thread(Some(thread))
            .project(client_info.as_ref().map(|info| &info.project))
            .client(client_info.as_ref().map(|info| &info.client))
            .bid(bid.as_ref())
            .milestones(&milestones.milestones)
            .first_message_at(first_message);
        for note in notes {
            builder = builder.error(note);
        }
        builder.build()
    }
}

fn missing_user() -> FetchError {
    FetchError::InvalidConfig("current user id unavailable".to_string())
}

/// Keeps the value, or records the failure as a note.
fn keep<T>(result: Result<T, FetchError>, what: &str, notes: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(what, error = %e, "Lookup failed");
            notes.push(format!("{what}: {e}"));
            None
        }
    }
}
