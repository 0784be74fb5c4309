//! CLI argument definitions using clap derive

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Evergreen offline cache
///
/// Installs the dashboard's asset manifest into a versioned local cache and
/// answers requests network-first, falling back to the cache when offline.
#[derive(Parser, Debug)]
#[command(name = "evergreen-cache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "EVERGREEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the dashboard origin, e.g. http://localhost:4173
    #[arg(long, global = true, env = "EVERGREEN_ORIGIN")]
    pub origin: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install and activate the configured cache version
    Install,

    /// Request paths through the cache
    Fetch(FetchArgs),

    /// List cache stores
    Stores,

    /// Delete cache stores
    Purge(PurgeArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Paths to request, resolved against the origin
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Print response bodies
    #[arg(long)]
    pub body: bool,
}

#[derive(Parser, Debug)]
pub struct PurgeArgs {
    /// Keep the store of the configured version
    #[arg(long)]
    pub keep_current: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Write the default configuration to the config file
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing config file with --init
    #[arg(long, requires = "init")]
    pub force: bool,
}
