// ABOUTME: CLI entry point for localization-sync
// ABOUTME: Parses commands and routes to appropriate handlers

use clap::{Parser, Subcommand};
use localization_sync::commands::{self, CheckConfigArgs, RunArgs};

#[derive(Parser)]
#[command(name = "localization-sync")]
#[command(about = "Sync localization entries with a remote record store", long_about = None)]
#[command(version)]
struct Cli {
    /// Set the log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export and/or import every selected target for one config section
    Run(RunArgs),
    /// Validate a config file without contacting the remote service
    CheckConfig(CheckConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log.clone()));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Run(args) => commands::run::command(args).await,
        Commands::CheckConfig(args) => commands::check_config::command(args).await,
    }
}
