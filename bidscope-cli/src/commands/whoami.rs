//! Whoami command - resolve the authenticated user.

use anyhow::Result;
use bidscope_fetch::resources::fetch_my_user_id;

use super::context::{fetch_context, load_settings};
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Runs the whoami command.
pub async fn run(cli: &Cli) -> Result<()> {
    let settings = load_settings().await?;
    let ctx = fetch_context(&settings, settings.fetch_settings())?;
    let user_id = fetch_my_user_id(&ctx).await?;

    match cli.format {
        OutputFormat::Text => println!("User id: {user_id}"),
        OutputFormat::Json => {
            let output = serde_json::json!({ "user_id": user_id });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(())
}
