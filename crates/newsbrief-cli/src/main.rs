use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsbrief_core::AppConfig;

mod commands;

#[derive(Parser)]
#[command(name = "newsbrief")]
#[command(author, version, about = "Summarize new feed entries with an LLM and post them to Slack")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (JSON, or TOML with a .toml extension)
    #[arg(short = 'c', long = "config", default_value = "config.json")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize and post everything published since the last run
    Run {
        /// Print the Slack payloads instead of posting them
        #[arg(long)]
        dry_run: bool,
    },
    /// List the entries the next run would summarize, without side effects
    Preview,
    /// Show the stored checkpoint
    Checkpoint,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    match cli.command {
        Some(Commands::Run { dry_run }) => commands::run::run(&config, dry_run).await,
        None => commands::run::run(&config, false).await,
        Some(Commands::Preview) => commands::preview::run(&config).await,
        Some(Commands::Checkpoint) => commands::checkpoint::run(&config),
    }
}
