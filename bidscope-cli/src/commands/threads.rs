//! Threads command - run the enrichment pipeline.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, bail};
use bidscope_core::ProgressTracker;
use bidscope_fetch::{DispatchStrategy, EnrichRequest, Enricher, LISTED_PERCENT};
use bidscope_store::{DatasetQuery, DatasetStore};
use chrono::{NaiveDate, NaiveTime};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::context::{fetch_context, load_settings};
use super::report::{RunReport, print_run};
use crate::{Cli, ExitCode};

/// Arguments for the threads command.
#[derive(Args)]
pub struct ThreadsArgs {
    /// Maximum number of project threads to enrich.
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Only threads updated on or after this date (YYYY-MM-DD or epoch seconds).
    #[arg(long)]
    pub from: Option<String>,

    /// Only threads updated on or before this date (YYYY-MM-DD or epoch seconds).
    #[arg(long)]
    pub to: Option<String>,

    /// Enrich one thread at a time.
    #[arg(long, conflicts_with = "concurrency")]
    pub sequential: bool,

    /// Threads enriched at once (overrides the settings file).
    #[arg(long, short = 'c', value_parser = clap::value_parser!(u16).range(1..=32))]
    pub concurrency: Option<u16>,

    /// Save the rows as a named dataset.
    #[arg(long, short = 's')]
    pub save: Option<String>,
}

/// Runs the threads command.
pub async fn run(args: &ThreadsArgs, cli: &Cli) -> Result<()> {
    let request = EnrichRequest {
        max_threads: args.limit,
        from: args.from.as_deref().map(|d| parse_date(d, false)).transpose()?,
        to: args.to.as_deref().map(|d| parse_date(d, true)).transpose()?,
    };
    if matches!((request.from, request.to), (Some(from), Some(to)) if from > to) {
        bail!("--from must not be after --to");
    }

    let settings = load_settings().await?;
    let mut fetch = settings.fetch_settings();
    if args.sequential {
        fetch.dispatch = DispatchStrategy::Sequential;
    } else if let Some(width) = args.concurrency {
        let width = usize::from(width);
        fetch.max_concurrent = width;
        fetch.dispatch = DispatchStrategy::Concurrent {
            max_in_flight: width,
        };
    }
    let ctx = fetch_context(&settings, fetch)?;

    let progress = RunProgress::new(cli.quiet)?;
    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    progress.start("threads");
    let outcome = Enricher::new(&ctx)
        .enrich_threads_until(
            &|percent: u8, message: &str| progress.fetched(percent, message),
            &request,
            &cancel,
        )
        .await;
    interrupt.abort();
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            progress.clear();
            return Err(e.into());
        }
    };
    progress.end_fetch();
    info!(
        rows = outcome.threads.len(),
        failures = outcome.failures,
        cancelled = outcome.cancelled,
        "Enrichment finished"
    );

    let dataset = match &args.save {
        Some(name) => {
            progress.start("persistence");
            let query = DatasetQuery {
                from_date: args.from.clone(),
                to_date: args.to.clone(),
                limit: args.limit,
            };
            let saved = DatasetStore::open_default()
                .save(name, query, outcome.threads.clone())
                .await;
            progress.end("persistence");
            match saved {
                Ok(meta) => Some(meta),
                Err(e) => {
                    progress.clear();
                    return Err(e.into());
                }
            }
        }
        None => None,
    };
    progress.finish();

    print_run(
        cli,
        &RunReport {
            rows: &outcome.threads,
            failures: outcome.failures,
            cancelled: outcome.cancelled,
            rate_limits: Some(&outcome.rate_limits),
            duration: Some(outcome.duration),
            dataset: dataset.as_ref(),
        },
    )?;

    if outcome.cancelled {
        std::process::exit(ExitCode::Cancelled as i32);
    }
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            warn!("Interrupted, returning the threads finished so far");
            cancel.cancel();
        }
        Err(e) => warn!(error = %e, "Failed to install Ctrl+C handler"),
    }
}

// ============================================================================
// Dates
// ============================================================================

/// Parses `YYYY-MM-DD` (UTC) or epoch seconds.
///
/// A calendar date means the start of that day, or its last second when
/// `end_of_day` is set.
pub fn parse_date(value: &str, end_of_day: bool) -> Result<i64> {
    let value = value.trim();
    if let Ok(epoch) = value.parse::<i64>() {
        return Ok(epoch);
    }

    let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") else {
        bail!("invalid date {value:?} (expected YYYY-MM-DD or epoch seconds)");
    };
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    };
    let Some(time) = time else {
        bail!("invalid time of day");
    };
    Ok(date.and_time(time).and_utc().timestamp())
}

// ============================================================================
// Progress Display
// ============================================================================

/// Categories every enriched thread fetches once each.
const PER_THREAD_CATEGORIES: [&str; 5] = ["projects", "users", "bids", "milestones", "messages"];

/// Progress bar fed by a weighted [`ProgressTracker`].
struct RunProgress {
    bar: ProgressBar,
    tracker: Mutex<ProgressTracker>,
}

impl RunProgress {
    fn new(quiet: bool) -> Result<Self> {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:30.cyan/blue}] {pos:>3}% {wide_msg}")?
                    .progress_chars("█▓░"),
            );
            bar
        };
        Ok(Self {
            bar,
            tracker: Mutex::new(ProgressTracker::default()),
        })
    }

    fn with_tracker(&self, f: impl FnOnce(&mut ProgressTracker)) -> Option<Duration> {
        let Ok(mut tracker) = self.tracker.lock() else {
            return None;
        };
        f(&mut tracker);
        self.bar.set_position(whole_percent(tracker.overall_progress()));
        tracker.estimated_remaining()
    }

    fn start(&self, category: &str) {
        self.with_tracker(|t| tracked(t.start_category(category)));
    }

    /// Maps a pipeline percent onto the fetch categories.
    ///
    /// Below [`LISTED_PERCENT`] the thread listing is still running; after
    /// it, every finished thread has done one fetch in each per-thread
    /// category, so they all advance together.
    fn fetched(&self, percent: u8, message: &str) {
        let eta = self.with_tracker(|t| {
            if percent < LISTED_PERCENT {
                let share = f64::from(percent) * 100.0 / f64::from(LISTED_PERCENT);
                tracked(t.update_category_progress("threads", share, Some(message)));
                return;
            }
            tracked(t.end_category("threads"));
            let share = f64::from(percent - LISTED_PERCENT) * 100.0
                / f64::from(100 - LISTED_PERCENT);
            for category in PER_THREAD_CATEGORIES {
                tracked(t.update_category_progress(category, share, Some(message)));
            }
        });
        self.bar.set_message(with_eta(message, eta));
    }

    fn end(&self, category: &str) {
        self.with_tracker(|t| tracked(t.end_category(category)));
    }

    fn end_fetch(&self) {
        self.with_tracker(|t| {
            tracked(t.end_category("threads"));
            for category in PER_THREAD_CATEGORIES {
                tracked(t.end_category(category));
            }
        });
    }

    fn finish(&self) {
        self.start("output");
        self.end("output");
        self.bar.finish_and_clear();
    }

    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

fn tracked(result: Result<(), bidscope_core::CoreError>) {
    if let Err(e) = result {
        debug!(error = %e, "Progress category not tracked");
    }
}

fn with_eta(message: &str, eta: Option<Duration>) -> String {
    match eta {
        Some(eta) => format!("{message} (ETA {})", format_eta(eta)),
        None => message.to_string(),
    }
}

/// Formats a remaining duration as `45s`, `3m 05s` or `1h 02m`.
fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    match secs {
        0..60 => format!("{secs}s"),
        60..3600 => format!("{}m {:02}s", secs / 60, secs % 60),
        _ => format!("{}h {:02}m", secs / 3600, secs % 3600 / 60),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_percent(value: f64) -> u64 {
    value.clamp(0.0, 100.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_calendar() {
        assert_eq!(parse_date("2024-03-01", false).unwrap(), 1_709_251_200);
        assert_eq!(parse_date("2024-03-01", true).unwrap(), 1_709_251_200 + 86_399);
    }

    #[test]
    fn test_parse_date_epoch() {
        assert_eq!(parse_date(" 1700000000 ", true).unwrap(), 1_700_000_000);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("March 1st", false).is_err());
        assert!(parse_date("2024-13-01", false).is_err());
    }

    #[test]
    fn test_whole_percent() {
        assert_eq!(whole_percent(-3.0), 0);
        assert_eq!(whole_percent(42.6), 43);
        assert_eq!(whole_percent(180.0), 100);
    }

    #[test]
    fn test_progress_tracks_fetch_categories() {
        let progress = RunProgress::new(true).unwrap();
        progress.start("threads");
        progress.fetched(5, "listing");
        assert_eq!(progress.bar.position(), 5);

        progress.fetched(LISTED_PERCENT, "Found 10 threads");
        assert_eq!(progress.bar.position(), 10);

        // Half the threads enriched: half of the 80 per-thread points.
        progress.fetched(55, "Thread 5/10");
        assert_eq!(progress.bar.position(), 50);

        progress.fetched(100, "Done");
        assert_eq!(progress.bar.position(), 90);

        progress.end_fetch();
        progress.start("output");
        progress.end("output");
        assert_eq!(progress.bar.position(), 95);
    }

    #[test]
    fn test_progress_message_carries_eta() {
        let progress = RunProgress::new(true).unwrap();
        progress.start("threads");
        progress.fetched(0, "Listing threads");
        assert_eq!(progress.bar.message(), "Listing threads");

        progress.fetched(55, "Thread 5/10");
        assert!(progress.bar.message().starts_with("Thread 5/10 (ETA "));
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(Duration::from_secs(45)), "45s");
        assert_eq!(format_eta(Duration::from_secs(185)), "3m 05s");
        assert_eq!(format_eta(Duration::from_secs(3720)), "1h 02m");
    }
}
