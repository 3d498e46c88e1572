//! Alime - media dubbing backend
//!
//! Entry point: loads configuration, sets up logging and either serves the
//! HTTP API or runs one of the maintenance commands.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use alime::cli::{Args, Commands};
use alime::config::{Config, LoggingConfig};
use alime::runner::SystemRunner;
use alime::server::{self, AppState};
use alime::store::Store;
use alime::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env()?;
    config.paths.root = std::path::absolute(&config.paths.root)
        .with_context(|| format!("Invalid root {}", config.paths.root.display()))?;

    let log_dir = config.paths.resolve(&config.logging.directory);
    let _guard = setup_logging(&log_dir, &config.logging, args.verbose)?;
    info!("Starting alime in {}", config.paths.root.display());

    if let Commands::InitConfig { output } = &args.command {
        Config::default().save_to_file(output)?;
        println!("Default configuration written to {}", output.display());
        return Ok(());
    }

    if let Commands::Serve { host, port } = &args.command {
        config.apply_overrides(host.clone(), port.map(|p| p.to_string()))?;
    }

    let store = Store::open(config.paths.resolve(&config.paths.database))?;
    let runner = SystemRunner::new(
        config.paths.root.clone(),
        config.paths.resolve(&config.paths.error_log),
    );
    let workflow = Workflow::new(config.clone(), Arc::new(store), Arc::new(runner));

    match args.command {
        Commands::Serve { .. } => {
            let version = workflow.check_dependencies().await?;
            info!("Using {}", version);

            let removed = workflow.cleanup_uploads().await?;
            if removed > 0 {
                info!("Removed {} expired uploads", removed);
            }

            server::serve(AppState::new(config.server.clone(), workflow)).await?;
        }
        Commands::Cleanup => {
            let removed = workflow.cleanup_uploads().await?;
            println!(
                "Removed {} uploads older than {} hours",
                removed, config.uploads.max_age_hours
            );
        }
        Commands::Check => {
            let version = workflow.check_dependencies().await?;
            println!("{}", version);
        }
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

/// Setup logging to both console and a daily rolling file
fn setup_logging(log_dir: &Path, logging: &LoggingConfig, verbose: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, &logging.file_name);
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join(&logging.file_name).display()
    );

    Ok(guard)
}
