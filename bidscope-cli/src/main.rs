// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Bidscope CLI - bid, thread and milestone analytics from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Enrich the 50 most recent active project threads
//! bidscope threads --limit 50
//!
//! # Only threads updated in March, saved for later
//! bidscope threads --from 2024-03-01 --to 2024-03-31 --save march
//!
//! # JSON output
//! bidscope --format json --pretty threads
//!
//! # Rows from an exported bulk file
//! bidscope rows --input export.json
//!
//! # Per-shift breakdown of a saved dataset
//! bidscope employees shifts march
//! ```

mod commands;
mod output;

use anyhow::Result;
use bidscope_fetch::FetchError;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{config, datasets, employees, rows, send, threads, whoami};

// ============================================================================
// CLI Definition
// ============================================================================

/// Bidscope CLI - freelancing-platform bid analytics.
#[derive(Parser)]
#[command(name = "bidscope")]
#[command(about = "Bid, thread and milestone analytics for freelancing-platform accounts")]
#[command(long_about = r#"
Bidscope joins your active project threads with their projects, clients,
your bids and paid milestones, and reports one row per thread.

The API token is read from BIDSCOPE_TOKEN or from the settings file
(see `bidscope config path`).

Examples:
  bidscope threads --limit 50          # Enrich recent threads
  bidscope threads --save march        # ...and keep them as a dataset
  bidscope datasets list               # Saved datasets
  bidscope employees shifts march      # Rows per employee shift
  bidscope --format json whoami        # JSON output
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (no logs, no progress bar).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Enrich active project threads.
    #[command(visible_alias = "t")]
    Threads(threads::ThreadsArgs),

    /// Build rows from an exported bulk-collections file.
    #[command(visible_alias = "r")]
    Rows(rows::RowsArgs),

    /// Manage saved datasets.
    #[command(visible_alias = "d")]
    Datasets(datasets::DatasetsArgs),

    /// Manage employees and their shifts.
    #[command(visible_alias = "e")]
    Employees(employees::EmployeesArgs),

    /// Send a message to a thread, or open a project thread.
    Send(send::SendArgs),

    /// Show the authenticated user id.
    Whoami,

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// No API token configured.
    MissingCredential = 2,
    /// The platform kept rate-limiting us.
    RateLimited = 3,
    /// Interrupted; partial output was written.
    Cancelled = 130,
}

impl ExitCode {
    /// Exit code for a failed command.
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<FetchError>() {
            Some(FetchError::MissingCredential) => Self::MissingCredential,
            Some(e) if e.is_rate_limited() => Self::RateLimited,
            _ => Self::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("bidscope=debug,info")
    } else {
        EnvFilter::new("bidscope=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Threads(args) => threads::run(args, &cli).await,
        Commands::Rows(args) => rows::run(args, &cli).await,
        Commands::Datasets(args) => datasets::run(args, &cli).await,
        Commands::Employees(args) => employees::run(args, &cli).await,
        Commands::Send(args) => send::run(args, &cli).await,
        Commands::Whoami => whoami::run(&cli).await,
        Commands::Config(args) => config::run(args, &cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}
