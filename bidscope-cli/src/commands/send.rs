//! Send command - message a thread or open a project thread.

use anyhow::Result;
use bidscope_fetch::resources::{create_thread, fetch_my_user_id, send_message};
use clap::Args;
use tracing::info;

use super::context::{fetch_context, load_settings};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the send command.
#[derive(Args)]
pub struct SendArgs {
    /// Existing thread to post to.
    #[arg(long, conflicts_with_all = ["project", "to"], required_unless_present = "project")]
    pub thread: Option<u64>,

    /// Project to open a new thread on.
    #[arg(long, requires = "to")]
    pub project: Option<u64>,

    /// User to open the project thread with.
    #[arg(long)]
    pub to: Option<u64>,

    /// Message text.
    #[arg(long, short = 'm')]
    pub message: String,
}

/// Runs the send command.
pub async fn run(args: &SendArgs, cli: &Cli) -> Result<()> {
    let message = args.message.trim();
    if message.is_empty() {
        anyhow::bail!("message is empty");
    }

    let settings = load_settings().await?;
    let ctx = fetch_context(&settings, settings.fetch_settings())?;

    let output = match (args.thread, args.project, args.to) {
        (Some(thread_id), _, _) => {
            let sent = send_message(&ctx, thread_id, message).await?;
            info!(thread_id, message_id = ?sent.id, "Message sent");
            sent_output(thread_id, sent.id)
        }
        (None, Some(project_id), Some(to)) => {
            let me = fetch_my_user_id(&ctx).await?;
            let members = thread_members(to, me);
            let thread = create_thread(&ctx, project_id, &members, message).await?;
            info!(thread_id = thread.id, project_id, "Thread created");
            opened_output(thread.id, project_id, &members)
        }
        _ => anyhow::bail!("pass --thread, or --project with --to"),
    };

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            let text = if args.thread.is_some() {
                format!("Message sent to thread {}", output["thread_id"])
            } else {
                format!("Opened thread {} on project {}", output["thread_id"], output["project_id"])
            };
            println!("{}", formatter.format_success(&text));
        }
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(&output)?),
    }

    Ok(())
}

fn sent_output(thread_id: u64, message_id: Option<u64>) -> serde_json::Value {
    serde_json::json!({
        "thread_id": thread_id,
        "message_id": message_id,
    })
}

fn opened_output(thread_id: u64, project_id: u64, members: &[u64]) -> serde_json::Value {
    serde_json::json!({
        "thread_id": thread_id,
        "project_id": project_id,
        "members": members,
    })
}

/// Recipient first, then the sender unless they are the same user.
fn thread_members(to: u64, me: u64) -> Vec<u64> {
    if to == me { vec![to] } else { vec![to, me] }
}
