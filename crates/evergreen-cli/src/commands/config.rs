use std::path::Path;

use anyhow::{bail, Result};
use evergreen_core::Config;

use crate::args::ConfigArgs;

pub fn run(config: &Config, config_path: Option<&Path>, args: ConfigArgs) -> Result<()> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };

    if args.init {
        if path.exists() && !args.force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
        Config::default().save_to(&path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    println!("# cache stores in {}", config.cache_dir()?.display());
    Ok(())
}
