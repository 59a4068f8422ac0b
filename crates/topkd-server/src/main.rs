use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use topkd_config::RuntimeConfig;

/// All-time top-K item aggregation service
#[derive(Parser)]
#[command(name = "topkd")]
#[command(version)]
#[command(about = "All-time top-K item aggregation service", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the continuous aggregator with the HTTP query surface
    Serve,
    /// Aggregate new events, write a checkpoint and exit
    Checkpoint,
    /// Append randomly generated item events to the local event log
    SeedEvents {
        /// Number of events to append
        #[arg(long, default_value_t = 1000)]
        count: usize,
        /// Size of the item id pool to draw from
        #[arg(long, default_value_t = 50)]
        distinct: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load_or_default().context("Failed to load configuration")?
    };

    if let Some(level) = &cli.log_level {
        config.server.log_level = level.clone();
    }

    topkd_server::init::init_tracing(&config.server);

    match cli.command {
        Command::Serve => topkd_server::run_server(config).await,
        Command::Checkpoint => topkd_server::run_check_point(config).await,
        Command::SeedEvents { count, distinct } => {
            topkd_server::run_seed_events(config, count, distinct).await
        }
    }
}
