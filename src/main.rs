//! Swatch - content-addressed colour swatches
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use swatch::cli::{Cli, Commands};
use swatch::config::{Config, ConfigManager};
use swatch::error::SwatchResult;
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
            if e.is_retryable() {
                eprintln!(
                    "{} nothing was memoized; running the command again is safe",
                    style("Retry:").dim()
                );
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> SwatchResult<()> {
    let cli = Cli::parse();

    // Commands that never touch configuration
    match cli.command {
        Commands::Render(args) => {
            init_logging(cli.verbose, "text");
            return swatch::cli::commands::render(args).await;
        }
        Commands::Completions(args) => return swatch::cli::commands::completions(args),
        _ => {}
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    let loaded = config_manager.load().await;
    let log_format = match loaded {
        Ok(ref config) => config.general.log_format.as_str(),
        Err(_) => "text",
    };
    init_logging(cli.verbose, log_format);

    let config = match loaded {
        Ok(config) => config,
        // `config` must stay usable to repair a broken file
        Err(e) if matches!(cli.command, Commands::Config(_)) => {
            tracing::warn!("{}", e);
            Config::default()
        }
        Err(e) => return Err(e),
    };

    ConfigManager::ensure_state_dirs().await?;

    match cli.command {
        Commands::Render(_) | Commands::Completions(_) => Ok(()),
        Commands::Mint(args) => swatch::cli::commands::mint(args, &config).await,
        Commands::Lookup(args) => swatch::cli::commands::lookup(args, &config).await,
        Commands::Cache(args) => swatch::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            swatch::cli::commands::config(args, &config_manager, &config).await
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, format: &str) {
    let filter = match verbose {
        0 => EnvFilter::new("swatch=warn"),
        1 => EnvFilter::new("swatch=info"),
        _ => EnvFilter::new("swatch=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
