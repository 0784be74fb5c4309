use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use super::key::{CachePolicy, RequestKey};
use super::storage::{CacheStorage, StoredResponse};
use crate::error::{validate_tag, CacheError, CacheResult};
use crate::models::{Request, Response};
use crate::net::Network;

/// Lifecycle of one cache version.
///
/// `uninstalled -> installing -> installed -> activating -> active`, with
/// `install-failed` as the failure exit of `installing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Active,
    InstallFailed,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Uninstalled => "uninstalled",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::InstallFailed => "install-failed",
        };
        f.pad(name)
    }
}

/// Where a handled response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    Synthetic,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::Synthetic => "synthetic",
        })
    }
}

/// Versioned cache-then-network response cache.
///
/// One manager owns one version tag. Installing fills that version's store
/// with the manifest, activating deletes every other version's store, and
/// once active `handle` answers requests from the network, falling back to
/// the store when the network is unreachable.
pub struct CacheManager {
    version: String,
    manifest: Vec<Request>,
    policy: CachePolicy,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
}

impl CacheManager {
    /// Create a manager for `version`, resolving each manifest path against
    /// `origin`. Paths that resolve to the same request identity are kept once.
    pub fn new<S: AsRef<str>>(
        version: impl Into<String>,
        origin: &Url,
        manifest: &[S],
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
    ) -> CacheResult<Self> {
        let version = version.into();
        validate_tag(&version)?;

        let mut seen = BTreeSet::new();
        let mut requests = Vec::with_capacity(manifest.len());
        for path in manifest {
            let request = Request::for_path("GET", origin, path.as_ref())?;
            if seen.insert(RequestKey::from_request(&request)) {
                requests.push(request);
            }
        }

        Ok(Self {
            version,
            manifest: requests,
            policy: CachePolicy::default(),
            storage,
            network,
            state: RwLock::new(WorkerState::Uninstalled),
        })
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn manifest_urls(&self) -> impl Iterator<Item = &Url> {
        self.manifest.iter().map(|r| &r.url)
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Entries currently held in this version's store.
    pub async fn entries(&self) -> CacheResult<Vec<StoredResponse>> {
        self.storage.entries(&self.version).await
    }

    async fn transition(
        &self,
        operation: &'static str,
        from: &[WorkerState],
        to: WorkerState,
    ) -> CacheResult<()> {
        let mut state = self.state.write().await;
        if !from.contains(&*state) {
            return Err(CacheError::InvalidState {
                operation,
                state: *state,
            });
        }
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        *self.state.write().await = to;
    }

    // ===== Install =====

    /// Open this version's store and fill it with every manifest resource.
    ///
    /// All manifest fetches must succeed with a 2xx status before anything
    /// is written. On failure a store created by this call is removed again
    /// and the manager ends in `install-failed`. Returns the number of
    /// manifest entries stored.
    pub async fn install(&self) -> CacheResult<usize> {
        self.transition(
            "install",
            &[WorkerState::Uninstalled, WorkerState::InstallFailed],
            WorkerState::Installing,
        )
        .await?;

        match self.populate().await {
            Ok(count) => {
                self.set_state(WorkerState::Installed).await;
                info!(version = %self.version, entries = count, "Installed cache version");
                Ok(count)
            }
            Err(e) => {
                self.set_state(WorkerState::InstallFailed).await;
                warn!(version = %self.version, error = %e, "Install failed");
                Err(e)
            }
        }
    }

    async fn populate(&self) -> CacheResult<usize> {
        let existed = self.storage.has(&self.version).await?;
        self.storage.open(&self.version).await?;

        let result = self.store_manifest().await;
        if result.is_err() && !existed {
            if let Err(e) = self.storage.delete(&self.version).await {
                warn!(version = %self.version, error = %e, "Failed to remove partial store");
            }
        }
        result
    }

    async fn store_manifest(&self) -> CacheResult<usize> {
        let fetches = self.manifest.iter().map(|request| async move {
            let response =
                self.network
                    .fetch(request)
                    .await
                    .map_err(|e| CacheError::InstallFailed {
                        url: request.url.to_string(),
                        reason: e.to_string(),
                    })?;
            if !response.is_ok() {
                return Err(CacheError::InstallFailed {
                    url: request.url.to_string(),
                    reason: format!("status {}", response.status),
                });
            }
            Ok((RequestKey::from_request(request), response))
        });
        let fetched = try_join_all(fetches).await?;

        for (key, response) in &fetched {
            self.storage.put(&self.version, key, response).await?;
        }
        Ok(fetched.len())
    }

    // ===== Activate =====

    /// Delete every store whose tag is not this version and become active.
    /// Returns the deleted tags.
    ///
    /// If a deletion fails the manager goes back to `installed` so the
    /// activation can be retried.
    pub async fn activate(&self) -> CacheResult<Vec<String>> {
        self.transition("activate", &[WorkerState::Installed], WorkerState::Activating)
            .await?;

        match self.purge_stale().await {
            Ok(deleted) => {
                self.set_state(WorkerState::Active).await;
                info!(version = %self.version, purged = deleted.len(), "Activated cache version");
                Ok(deleted)
            }
            Err(e) => {
                self.set_state(WorkerState::Installed).await;
                warn!(version = %self.version, error = %e, "Activation failed");
                Err(e)
            }
        }
    }

    /// Become active on top of a store left by an earlier process.
    ///
    /// Stale stores are purged exactly as `activate` does.
    pub async fn resume(&self) -> CacheResult<Vec<String>> {
        let mut state = self.state.write().await;
        if *state != WorkerState::Uninstalled {
            return Err(CacheError::InvalidState {
                operation: "resume",
                state: *state,
            });
        }
        if !self.storage.has(&self.version).await? {
            return Err(CacheError::NotInstalled(self.version.clone()));
        }

        let deleted = self.purge_stale().await?;
        *state = WorkerState::Active;
        info!(version = %self.version, purged = deleted.len(), "Resumed cache version");
        Ok(deleted)
    }

    async fn purge_stale(&self) -> CacheResult<Vec<String>> {
        let stale: Vec<String> = self
            .storage
            .tags()
            .await?
            .into_iter()
            .filter(|tag| *tag != self.version)
            .collect();

        try_join_all(stale.iter().map(|tag| self.storage.delete(tag))).await?;
        for tag in &stale {
            debug!(tag = %tag, "Purged stale store");
        }
        Ok(stale)
    }

    // ===== Intercept =====

    /// Answer a request: network first, cached copy when the network is
    /// unreachable, the synthetic failure response when neither exists.
    pub async fn handle(&self, request: &Request) -> Response {
        self.handle_with_source(request).await.0
    }

    pub async fn handle_with_source(&self, request: &Request) -> (Response, ResponseSource) {
        let active = *self.state.read().await == WorkerState::Active;
        if !active || !self.policy.allows(request) {
            return self.passthrough(request).await;
        }

        let key = RequestKey::from_request(request);
        let cached = match self.storage.get(&self.version, &key).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache lookup failed, treating as miss");
                None
            }
        };

        match self.network.fetch(request).await {
            Ok(fresh) => {
                if let Err(e) = self.storage.put(&self.version, &key, &fresh).await {
                    warn!(key = %key, error = %e, "Failed to store fresh response");
                }
                (fresh, ResponseSource::Network)
            }
            Err(e) => match cached {
                Some(entry) => {
                    debug!(key = %key, error = %e, "Network unavailable, serving cached response");
                    (entry.response, ResponseSource::Cache)
                }
                None => {
                    debug!(key = %key, error = %e, "Network unavailable and nothing cached");
                    (Response::error(), ResponseSource::Synthetic)
                }
            },
        }
    }

    async fn passthrough(&self, request: &Request) -> (Response, ResponseSource) {
        match self.network.fetch(request).await {
            Ok(response) => (response, ResponseSource::Network),
            Err(e) => {
                debug!(method = %request.method, url = %request.url, error = %e, "Uncached request failed");
                (Response::error(), ResponseSource::Synthetic)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
