use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "beacon", about = "Fire analytics events from a headless page")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a page view
    Page(commands::page::PageArgs),
    /// Record a named event
    Trigger(commands::trigger::TriggerArgs),
    /// Replay a queue of calls captured before the agent loaded
    Replay(commands::replay::ReplayArgs),
    /// Show the stored first-touch attribution
    Attribution(commands::attribution::AttributionArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    // Dry-run payloads go to stdout
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Page(args) => commands::page::run(args).await,
        Commands::Trigger(args) => commands::trigger::run(args).await,
        Commands::Replay(args) => commands::replay::run(args).await,
        Commands::Attribution(args) => commands::attribution::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
