//! Rows command - build rows from an exported bulk-collections file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bidscope_core::{BulkCollections, transform_to_rows};
use bidscope_store::{DatasetQuery, DatasetStore};
use clap::Args;
use tracing::info;

use super::report::{RunReport, print_run};
use crate::Cli;

/// Arguments for the rows command.
#[derive(Args)]
pub struct RowsArgs {
    /// JSON file with `bids`, `projects`, `users`, `threads` and `milestones`.
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    /// Save the rows as a named dataset.
    #[arg(long, short = 's')]
    pub save: Option<String>,
}

/// Runs the rows command.
pub async fn run(args: &RowsArgs, cli: &Cli) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let collections: BulkCollections = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a bulk-collections file", args.input.display()))?;

    let rows = transform_to_rows(&collections);
    let failures = rows.iter().filter(|r| r.error.is_some()).count();
    info!(bids = collections.bids.len(), rows = rows.len(), "Transformed bulk file");

    let dataset = match &args.save {
        Some(name) => Some(
            DatasetStore::open_default()
                .save(name, DatasetQuery::default(), rows.clone())
                .await?,
        ),
        None => None,
    };

    print_run(
        cli,
        &RunReport {
            rows: &rows,
            failures,
            cancelled: false,
            rate_limits: None,
            duration: None,
            dataset: dataset.as_ref(),
        },
    )
}
