mod gateway;
mod queue;
mod reprice;
mod retry;

#[cfg(test)]
mod tests;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::gateway::GatewayCommands;
use crate::queue::QueueCommands;

#[derive(Debug, Parser)]
#[command(name = "sourcing-cli")]
#[command(about = "Registration queue batch tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Recompute sale prices from wholesale cost
    Reprice {
        /// Show the changes without writing the queue
        #[arg(long, conflicts_with = "apply")]
        dry_run: bool,
        /// After saving, push new prices to the marketplace
        #[arg(long)]
        apply: bool,
        /// User whose marketplace credentials are used with --apply
        #[arg(long, env = "SOURCING_USER_ID")]
        user: Option<String>,
    },
    /// Move failed items back to pending
    Retry {
        /// Show the decisions without writing the queue
        #[arg(long)]
        dry_run: bool,
        /// Move items over the retry limit to error_permanent
        #[arg(long)]
        abandon_exhausted: bool,
        /// Override SOURCING_MAX_RETRIES
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// Inspect or edit the queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Raw marketplace calls for debugging
    Gateway {
        #[command(subcommand)]
        command: GatewayCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("sourcing-cli: run with --help to list commands");
        return Ok(());
    };

    let config = sourcing_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Reprice {
            dry_run,
            apply,
            user,
        } => reprice::run_reprice(&config, dry_run, apply, user.as_deref()).await,
        Commands::Retry {
            dry_run,
            abandon_exhausted,
            max_retries,
        } => retry::run_retry(&config, dry_run, abandon_exhausted, max_retries),
        Commands::Queue { command } => queue::run_queue(&config, command),
        Commands::Gateway { command } => gateway::run_gateway(&config, command).await,
    }
}

/// Shortens `text` to at most `max` characters, marking the cut with `...`.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_owned()
    }
}

/// Format an optional value for display, returning an em dash when `None`.
pub(crate) fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "\u{2014}".to_string(), |v| v.to_string())
}
