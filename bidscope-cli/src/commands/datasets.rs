//! Datasets command - list, show and delete saved datasets.

use anyhow::Result;
use bidscope_store::DatasetStore;
use clap::{Args, Subcommand};

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the datasets command.
#[derive(Args)]
pub struct DatasetsArgs {
    #[command(subcommand)]
    pub action: DatasetsAction,
}

/// Datasets subcommands.
#[derive(Subcommand)]
pub enum DatasetsAction {
    /// List saved datasets, newest first.
    List,

    /// Show one dataset.
    Show {
        /// Dataset name.
        name: String,
    },

    /// Delete a dataset.
    Delete {
        /// Dataset name.
        name: String,
    },
}

/// Runs the datasets command.
pub async fn run(args: &DatasetsArgs, cli: &Cli) -> Result<()> {
    let store = DatasetStore::open_default();
    let text = TextFormatter::new(!cli.no_color);
    let json = JsonFormatter::new(cli.pretty);

    match &args.action {
        DatasetsAction::List => {
            let metas = store.list().await?;
            match cli.format {
                OutputFormat::Text => println!("{}", text.format_datasets(&metas)),
                OutputFormat::Json => println!("{}", json.format(&metas)?),
            }
        }
        DatasetsAction::Show { name } => {
            let dataset = store.load(name).await?;
            match cli.format {
                OutputFormat::Text => {
                    println!("{}", text.format_dataset_meta(&dataset.meta));
                    println!("{}", "─".repeat(40));
                    println!("{}", text.format_rows(&dataset.rows));
                }
                OutputFormat::Json => println!("{}", json.format(&dataset)?),
            }
        }
        DatasetsAction::Delete { name } => {
            store.delete(name).await?;
            match cli.format {
                OutputFormat::Text => {
                    println!("{}", text.format_success(&format!("Deleted dataset {name}")));
                }
                OutputFormat::Json => {
                    let output = serde_json::json!({ "deleted": name });
                    println!("{}", json.format(&output)?);
                }
            }
        }
    }

    Ok(())
}
