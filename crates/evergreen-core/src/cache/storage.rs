use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::RequestKey;
use crate::error::CacheResult;
use crate::models::Response;
use crate::utils::format_age;

/// A response as it sits in a named store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub key: RequestKey,
    pub stored_at: DateTime<Utc>,
    pub response: Response,
}

impl StoredResponse {
    pub fn new(key: RequestKey, response: Response) -> Self {
        Self {
            key,
            stored_at: Utc::now(),
            response,
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.stored_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        format_age(self.age_minutes())
    }
}

/// Named, version-tagged key/value stores of responses.
///
/// Same-key writes are not coordinated: the last `put` wins.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the store for `tag` if it does not exist yet.
    async fn open(&self, tag: &str) -> CacheResult<()>;

    async fn has(&self, tag: &str) -> CacheResult<bool>;

    /// All store tags currently present, sorted.
    async fn tags(&self) -> CacheResult<Vec<String>>;

    /// Delete a whole store. Returns whether it existed.
    async fn delete(&self, tag: &str) -> CacheResult<bool>;

    async fn get(&self, tag: &str, key: &RequestKey) -> CacheResult<Option<StoredResponse>>;

    /// Store `response` under `key`, creating the store if needed and
    /// replacing any previous entry.
    async fn put(&self, tag: &str, key: &RequestKey, response: &Response) -> CacheResult<()>;

    /// All entries of a store, sorted by key. Empty if the store is missing.
    async fn entries(&self, tag: &str) -> CacheResult<Vec<StoredResponse>>;
}
