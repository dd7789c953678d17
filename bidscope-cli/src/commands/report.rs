//! Printing the result of a run.

use std::time::Duration;

use anyhow::Result;
use bidscope_core::{EnrichedRecord, RateLimitSnapshot};
use bidscope_store::DatasetMeta;

use crate::output::{JsonFormatter, RunOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// What a threads or rows run produced.
pub struct RunReport<'a> {
    pub rows: &'a [EnrichedRecord],
    pub failures: usize,
    pub cancelled: bool,
    pub rate_limits: Option<&'a RateLimitSnapshot>,
    pub duration: Option<Duration>,
    pub dataset: Option<&'a DatasetMeta>,
}

/// Prints a run in the selected format.
pub fn print_run(cli: &Cli, report: &RunReport<'_>) -> Result<()> {
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_rows(report.rows));
            println!();
            println!(
                "{}",
                formatter.format_run_summary(
                    report.rows,
                    report.failures,
                    report.cancelled,
                    report.duration
                )
            );
            if let Some(limits) = report.rate_limits {
                println!("{}", formatter.format_rate_limits(limits));
            }
            if let Some(meta) = report.dataset {
                println!(
                    "{}",
                    formatter.format_success(&format!("Saved dataset {}", meta.name))
                );
            }
        }
        OutputFormat::Json => {
            let output = RunOutput {
                threads: report.rows,
                failures: report.failures,
                cancelled: report.cancelled,
                rate_limits: report.rate_limits,
                duration_ms: report
                    .duration
                    .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
                dataset: report.dataset,
            };
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }
    Ok(())
}
