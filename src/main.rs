//! Segforge - on-demand media segment transcoder
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use segforge::cli::{Cli, Commands};
use segforge::config::ConfigManager;
use segforge::error::SegforgeResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> SegforgeResult<()> {
    let cli = Cli::parse();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("segforge=warn"),
        1 => EnvFilter::new("segforge=info"),
        _ => EnvFilter::new("segforge=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .init();
    }
    debug!("Using config at {}", config_manager.path().display());

    match cli.command {
        Commands::Transcode(args) => segforge::cli::commands::transcode(args, &config).await,
        Commands::Fingerprint(args) => segforge::cli::commands::fingerprint(args, &config).await,
        Commands::Profiles => segforge::cli::commands::profiles(&config).await,
        Commands::Config(args) => {
            segforge::cli::commands::config(args, &config, &config_manager).await
        }
        Commands::Cache(args) => segforge::cli::commands::cache(args, &config).await,
    }
}
