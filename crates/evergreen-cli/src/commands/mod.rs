//! Command implementations

mod config;
mod fetch;
mod install;
mod stores;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use evergreen_core::{CacheError, CacheManager, CacheStorage, Config, DiskStorage, Network};
use tracing::warn;

use crate::args::Commands;

pub async fn run(command: Commands, config: &Config, config_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Install => install::run(config).await,
        Commands::Fetch(args) => fetch::run(config, args).await,
        Commands::Stores => stores::list(config).await,
        Commands::Purge(args) => stores::purge(config, args).await,
        Commands::Config(args) => config::run(config, config_path, args),
    }
}

/// Storage and network shared by the commands that drive a manager.
pub(crate) struct Host {
    pub storage: Arc<dyn CacheStorage>,
    pub network: Arc<dyn Network>,
}

impl Host {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            storage: Arc::new(DiskStorage::new(config.cache_dir()?)),
            network: Arc::new(config.network()?),
        })
    }

    pub fn manager(&self, config: &Config) -> Result<CacheManager> {
        config.build_manager(self.storage.clone(), self.network.clone())
    }
}

/// Get an active manager for the configured version.
///
/// Resumes an existing store, otherwise installs and activates. If that
/// install fails, the previously active version (the only other store left
/// by its activation) keeps serving. Returns `None` when nothing can serve
/// from cache.
pub(crate) async fn active_manager(host: &Host, config: &Config) -> Result<Option<CacheManager>> {
    let manager = host.manager(config)?;
    match manager.resume().await {
        Ok(_) => return Ok(Some(manager)),
        Err(CacheError::NotInstalled(_)) => {}
        Err(e) => return Err(e.into()),
    }

    match manager.install().await {
        Ok(_) => {
            manager.activate().await?;
            return Ok(Some(manager));
        }
        Err(e) => {
            warn!(version = %config.version_tag, error = %e, "Falling back to previous cache version");
            eprintln!("Warning: {}", e);
        }
    }

    let previous: Vec<String> = host
        .storage
        .tags()
        .await?
        .into_iter()
        .filter(|tag| *tag != config.version_tag)
        .collect();
    match previous.as_slice() {
        [tag] => {
            let fallback = Config {
                version_tag: tag.clone(),
                ..config.clone()
            };
            let manager = host.manager(&fallback)?;
            manager.resume().await?;
            eprintln!("Serving cached version {}", tag);
            Ok(Some(manager))
        }
        _ => Ok(None),
    }
}
