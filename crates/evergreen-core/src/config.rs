//! Application configuration management.
//!
//! This module handles loading and saving the cache configuration: the
//! version tag, the asset manifest, the origin the dashboard is served from,
//! and which requests may be cached.
//!
//! Configuration is stored at `~/.config/evergreen-cache/config.json`.
//! Every field is optional; missing fields take the defaults below.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::{CacheManager, CachePolicy, CacheStorage, DEFAULT_CACHEABLE_METHODS};
use crate::error::validate_tag;
use crate::net::{HttpNetwork, Network, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "evergreen-cache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Current cache version. Bump whenever the manifest or caching policy changes.
pub const DEFAULT_VERSION_TAG: &str = "evergreen-cache-v1";

/// Resources the dashboard needs to render offline.
pub const DEFAULT_MANIFEST: &[&str] = &["/", "/index.html", "/manifest.webmanifest"];

/// Where the dashboard is served from (vite preview default).
pub const DEFAULT_ORIGIN: &str = "http://localhost:4173";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version_tag: String,
    pub manifest: Vec<String>,
    pub origin: String,
    pub cacheable_methods: Vec<String>,
    pub excluded_paths: Vec<String>,
    pub request_timeout_secs: u64,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version_tag: DEFAULT_VERSION_TAG.to_string(),
            manifest: DEFAULT_MANIFEST.iter().map(|p| p.to_string()).collect(),
            origin: DEFAULT_ORIGIN.to_string(),
            cacheable_methods: DEFAULT_CACHEABLE_METHODS.iter().map(|m| m.to_string()).collect(),
            excluded_paths: Vec::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            cache_dir: None,
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Root directory holding one subdirectory per cache version.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn validate(&self) -> Result<()> {
        validate_tag(&self.version_tag)?;

        if self.manifest.is_empty() {
            bail!("manifest must list at least one resource");
        }
        if let Some(bad) = self.manifest.iter().find(|p| !p.starts_with('/')) {
            bail!("manifest entry {:?} must be an absolute path", bad);
        }
        if self.cacheable_methods.is_empty() {
            bail!("cacheable_methods must not be empty");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be at least 1");
        }

        self.origin_url()?;
        Ok(())
    }

    pub fn origin_url(&self) -> Result<Url> {
        let url = Url::parse(&self.origin)
            .with_context(|| format!("Invalid origin: {}", self.origin))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("origin must be an http(s) URL, got {}", self.origin);
        }
        Ok(url)
    }

    pub fn policy(&self) -> CachePolicy {
        CachePolicy::new(&self.cacheable_methods, &self.excluded_paths)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// HTTP network backend with the configured timeout.
    pub fn network(&self) -> Result<HttpNetwork> {
        HttpNetwork::with_timeout(self.request_timeout()).context("Failed to build HTTP client")
    }

    /// Build a manager for the configured version on top of `storage` and `network`.
    pub fn build_manager(
        &self,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
    ) -> Result<CacheManager> {
        let manager = CacheManager::new(
            self.version_tag.clone(),
            &self.origin_url()?,
            self.manifest.as_slice(),
            storage,
            network,
        )?;
        Ok(manager.with_policy(self.policy()))
    }
}
