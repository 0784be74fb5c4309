use anyhow::{Context, Result};
use evergreen_core::Config;

use super::Host;

pub async fn run(config: &Config) -> Result<()> {
    let host = Host::new(config)?;
    let manager = host.manager(config)?;

    eprintln!(
        "Installing {} from {} ({} resources)...",
        manager.version(),
        config.origin,
        manager.manifest_urls().count()
    );
    let count = manager
        .install()
        .await
        .with_context(|| format!("Install of {} failed", manager.version()))?;
    let purged = manager.activate().await?;

    println!("Installed {} with {} entries", manager.version(), count);
    for tag in purged {
        println!("Purged stale store {}", tag);
    }
    Ok(())
}
