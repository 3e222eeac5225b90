//! Photo Organizer - sort unlabeled photos into dated directories
//!
//! Scans phone or camera picture folders, bundles each shot with its
//! sidecars, and moves or copies the bundles into date (and place)
//! named subdirectories of the destination.

use anyhow::Result;
use clap::Parser;
use photo_organizer::{Cli, Config, Processor};
use std::fs::OpenOptions;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let _guard = setup_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Photo organizer starting"
    );

    let config = load_config(&cli)?;
    if config.verbose {
        info!(?config, "Configuration loaded");
    }
    config.validate()?;

    let processor = Processor::new(config)?;
    match processor.run() {
        Ok(summary) => {
            if processor.config().dry_run {
                info!(
                    actions = summary.actions.len(),
                    "Dry run: no files were changed"
                );
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Organizing failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        info!(config_file = %config_path.display(), "Loading configuration from file");
        let file_config = Config::load_from_file(config_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    if config.source_dirs.is_empty() {
        anyhow::bail!("no source directory given on the command line or in the config file");
    }

    Ok(config)
}

/// Console logging, plus a log file when requested
fn setup_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let (file_layer, guard) = match cli.log_file {
        Some(ref log_path) => {
            if let Some(parent) = log_path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);

            (
                Some(fmt::layer().with_ansi(false).with_writer(non_blocking)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    if cli.json_log {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stdout))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stdout))
            .init();
    }

    Ok(guard)
}
