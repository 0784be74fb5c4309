use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::key::RequestKey;
use super::storage::{CacheStorage, StoredResponse};
use crate::error::{validate_tag, CacheResult};
use crate::models::Response;

type Stores = BTreeMap<String, BTreeMap<RequestKey, StoredResponse>>;

/// In-process storage. Clones share the same stores.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    stores: Arc<RwLock<Stores>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, tag: &str) -> CacheResult<()> {
        validate_tag(tag)?;
        self.stores.write().await.entry(tag.to_string()).or_default();
        Ok(())
    }

    async fn has(&self, tag: &str) -> CacheResult<bool> {
        Ok(self.stores.read().await.contains_key(tag))
    }

    async fn tags(&self) -> CacheResult<Vec<String>> {
        Ok(self.stores.read().await.keys().cloned().collect())
    }

    async fn delete(&self, tag: &str) -> CacheResult<bool> {
        Ok(self.stores.write().await.remove(tag).is_some())
    }

    async fn get(&self, tag: &str, key: &RequestKey) -> CacheResult<Option<StoredResponse>> {
        Ok(self
            .stores
            .read()
            .await
            .get(tag)
            .and_then(|store| store.get(key))
            .cloned())
    }

    async fn put(&self, tag: &str, key: &RequestKey, response: &Response) -> CacheResult<()> {
        validate_tag(tag)?;
        let entry = StoredResponse::new(key.clone(), response.clone());
        self.stores
            .write()
            .await
            .entry(tag.to_string())
            .or_default()
            .insert(key.clone(), entry);
        Ok(())
    }

    async fn entries(&self, tag: &str) -> CacheResult<Vec<StoredResponse>> {
        Ok(self
            .stores
            .read()
            .await
            .get(tag)
            .map(|store| store.values().cloned().collect())
            .unwrap_or_default())
    }
}
