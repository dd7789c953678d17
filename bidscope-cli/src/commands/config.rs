//! Config command - manage configuration.

use anyhow::Result;
use bidscope_store::{
    SettingsStore, TOKEN_ENV, default_config_dir, default_data_dir, default_settings_path,
};
use clap::{Args, Subcommand};
use tracing::info;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration (token masked).
    Show,

    /// Show configuration paths.
    Path,

    /// Set one setting.
    Set {
        /// Setting name (see `config show`).
        key: String,
        /// New value; `none` clears optional settings.
        value: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await,
        ConfigAction::Path => show_paths(cli),
        ConfigAction::Set { key, value } => set_value(key, value, cli).await,
        ConfigAction::Reset => reset_config(cli).await,
    }
}

async fn show_config(cli: &Cli) -> Result<()> {
    let store = SettingsStore::load_default().await?;
    let settings = store.get().await;
    let token_source = if std::env::var(TOKEN_ENV).is_ok_and(|t| !t.trim().is_empty()) {
        "environment"
    } else if settings.token.is_some() {
        "settings file"
    } else {
        "not set"
    };
    let settings = settings.redacted();

    match cli.format {
        OutputFormat::Text => {
            println!("Bidscope Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("API base URL:      {}", settings.api_base_url);
            println!("Credential header: {}", settings.credential_header);
            println!("Token:             {token_source}");
            println!(
                "Fallback user id:  {}",
                settings
                    .fallback_user_id
                    .map_or_else(|| "none".to_string(), |id| id.to_string())
            );
            println!();
            println!("Max concurrent:    {}", settings.max_concurrent);
            println!("Max retries:       {}", settings.max_retries);
            println!("Request timeout:   {}s", settings.request_timeout_secs);
            println!("Thread page size:  {}", settings.thread_page_size);
            println!("Sequential:        {}", settings.sequential);
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&settings)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_path = default_settings_path();
    let data_dir = default_data_dir();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", settings_path.display());
            println!("Data dir:      {}", data_dir.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
                "data_dir": data_dir.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn set_value(key: &str, value: &str, cli: &Cli) -> Result<()> {
    let store = SettingsStore::load_default().await?;
    store.set_value(key, value).await?;
    store.save().await?;

    info!(key, "Setting updated");
    let shown = if key == "token" { "********" } else { value };
    if cli.format == OutputFormat::Text {
        let formatter = TextFormatter::new(!cli.no_color);
        println!("{}", formatter.format_success(&format!("{key} = {shown}")));
    } else {
        let output = serde_json::json!({ "key": key, "value": shown });
        println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
    }

    Ok(())
}

async fn reset_config(_cli: &Cli) -> Result<()> {
    let path = default_settings_path();

    if tokio::fs::try_exists(&path).await? {
        tokio::fs::remove_file(&path).await?;
        info!(path = %path.display(), "Settings reset");
        println!("Configuration reset to defaults");
    } else {
        println!("No configuration file to reset");
    }

    Ok(())
}
