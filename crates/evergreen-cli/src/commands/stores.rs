use anyhow::Result;
use evergreen_core::{CacheStorage, Config, DiskStorage};

use crate::args::PurgeArgs;

pub async fn list(config: &Config) -> Result<()> {
    let storage = DiskStorage::new(config.cache_dir()?);
    let tags = storage.tags().await?;
    if tags.is_empty() {
        println!("No cache stores in {}", storage.root().display());
        return Ok(());
    }

    for tag in tags {
        let entries = storage.entries(&tag).await?;
        let updated = entries
            .iter()
            .max_by_key(|e| e.stored_at)
            .map(|e| e.age_display())
            .unwrap_or_else(|| "never".to_string());
        let marker = if tag == config.version_tag { "*" } else { " " };
        println!("{} {:<24} {:>5} entries  updated {}", marker, tag, entries.len(), updated);
    }
    Ok(())
}

pub async fn purge(config: &Config, args: PurgeArgs) -> Result<()> {
    let storage = DiskStorage::new(config.cache_dir()?);
    let mut purged = 0;
    for tag in storage.tags().await? {
        if args.keep_current && tag == config.version_tag {
            continue;
        }
        if storage.delete(&tag).await? {
            println!("Deleted {}", tag);
            purged += 1;
        }
    }
    if purged == 0 {
        println!("Nothing to purge");
    }
    Ok(())
}
