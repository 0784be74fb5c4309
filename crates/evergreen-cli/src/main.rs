//! Evergreen cache CLI - drives the offline cache for the Evergreen dashboard.
//!
//! Installs the asset manifest into a versioned on-disk cache, purges stale
//! versions, and routes requests through the cache so the last good response
//! is served when the origin is unreachable.

mod args;
mod commands;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use evergreen_core::Config;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Commands, ConfigArgs};

/// Initialize the tracing subscriber for logging.
///
/// RUST_LOG wins over -v. The returned guard must live until exit so a
/// file writer flushes.
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

/// `config --init` writes a fresh file, so it must work even when the
/// existing one no longer loads.
fn needs_existing_config(command: &Commands) -> bool {
    !matches!(command, Commands::Config(ConfigArgs { init: true, .. }))
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(ref origin) = cli.origin {
        config.origin = origin.clone();
        config.validate()?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;
    info!("evergreen-cache starting");

    let config = if needs_existing_config(&cli.command) {
        load_config(&cli)?
    } else {
        Config::default()
    };
    commands::run(cli.command, &config, cli.config.as_deref()).await
}
