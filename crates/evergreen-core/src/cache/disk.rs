//! Filesystem-backed cache storage.
//!
//! ```text
//! <root>/
//!   evergreen-cache-v1/
//!     .evergreen-store   # ownership marker
//!     3f1c...e9.json     # one StoredResponse per request key
//!   evergreen-cache-v2/
//! ```
//!
//! Only directories carrying the marker are stores. Anything else under the
//! root is never listed or deleted, so the root may be shared with other
//! applications.
//!
//! Entry files are named by the SHA-256 of the request key and written via a
//! uniquely named temp file plus rename, so concurrent writers to one key
//! leave the last complete write behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use super::key::RequestKey;
use super::storage::{CacheStorage, StoredResponse};
use crate::error::{validate_tag, CacheError, CacheResult};
use crate::models::Response;

const ENTRY_EXTENSION: &str = "json";

/// Written into every store directory this storage creates.
const STORE_MARKER: &str = ".evergreen-store";

#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, tag: &str) -> CacheResult<PathBuf> {
        validate_tag(tag)?;
        Ok(self.root.join(tag))
    }

    /// Create the store directory and its marker if missing.
    async fn ensure_store(&self, tag: &str) -> CacheResult<PathBuf> {
        let dir = self.store_dir(tag)?;
        fs::create_dir_all(&dir).await?;
        let marker = dir.join(STORE_MARKER);
        if !is_file(&marker).await? {
            fs::write(&marker, "").await?;
        }
        Ok(dir)
    }

    async fn is_store(dir: &Path) -> CacheResult<bool> {
        match fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => is_file(&dir.join(STORE_MARKER)).await,
            Ok(_) => Ok(false),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn entry_file_name(key: &RequestKey) -> String {
        let digest = Sha256::digest(key.to_string().as_bytes());
        format!("{}.{}", hex::encode(digest), ENTRY_EXTENSION)
    }

    async fn read_entry(path: &Path) -> CacheResult<Option<StoredResponse>> {
        match fs::read_to_string(path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_atomic(path: &Path, contents: &str) -> CacheResult<()> {
        let temp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4()));

        fs::write(&temp_path, contents).await?;
        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

async fn is_file(path: &Path) -> CacheResult<bool> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, tag: &str) -> CacheResult<()> {
        self.ensure_store(tag).await?;
        Ok(())
    }

    async fn has(&self, tag: &str) -> CacheResult<bool> {
        Self::is_store(&self.store_dir(tag)?).await
    }

    async fn tags(&self) -> CacheResult<Vec<String>> {
        let mut read_dir = match fs::read_dir(&self.root).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut tags = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_tag(&name).is_ok() && Self::is_store(&entry.path()).await? {
                tags.push(name);
            }
        }
        tags.sort();
        Ok(tags)
    }

    async fn delete(&self, tag: &str) -> CacheResult<bool> {
        let dir = self.store_dir(tag)?;
        if !Self::is_store(&dir).await? {
            if fs::metadata(&dir).await.is_ok() {
                debug!(path = %dir.display(), "Not a cache store, leaving in place");
            }
            return Ok(false);
        }
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(tag, "deleted store");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, tag: &str, key: &RequestKey) -> CacheResult<Option<StoredResponse>> {
        let path = self.store_dir(tag)?.join(Self::entry_file_name(key));
        match Self::read_entry(&path).await? {
            Some(entry) if entry.key == *key => Ok(Some(entry)),
            Some(entry) => Err(CacheError::Storage(format!(
                "entry {} holds {} instead of {}",
                path.display(),
                entry.key,
                key
            ))),
            None => Ok(None),
        }
    }

    async fn put(&self, tag: &str, key: &RequestKey, response: &Response) -> CacheResult<()> {
        let dir = self.ensure_store(tag).await?;

        let entry = StoredResponse::new(key.clone(), response.clone());
        let contents = serde_json::to_string_pretty(&entry)?;
        Self::write_atomic(&dir.join(Self::entry_file_name(key)), &contents).await
    }

    async fn entries(&self, tag: &str) -> CacheResult<Vec<StoredResponse>> {
        let dir = self.store_dir(tag)?;
        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(file) = read_dir.next_entry().await? {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            match Self::read_entry(&path).await {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable cache entry"),
            }
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use url::Url;

    use crate::models::Request;

    fn create_test_storage() -> (DiskStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = DiskStorage::new(temp_dir.path().join("stores"));
        (storage, temp_dir)
    }

    fn key(path: &str) -> RequestKey {
        let url = Url::parse("http://localhost:4173/").unwrap().join(path).unwrap();
        RequestKey::from_request(&Request::get(url))
    }

    #[tokio::test]
    async fn test_missing_root_has_no_tags() {
        let (storage, _temp_dir) = create_test_storage();
        assert!(storage.tags().await.unwrap().is_empty());
        assert!(!storage.has("v1").await.unwrap());
        assert!(storage.entries("v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entries_persist_across_instances() {
        let (storage, _temp_dir) = create_test_storage();
        let response = Response::new(200, "<html></html>").with_header("content-type", "text/html");
        storage.put("v1", &key("/index.html"), &response).await.unwrap();

        let reopened = DiskStorage::new(storage.root().to_path_buf());
        let entry = reopened
            .get("v1", &key("/index.html"))
            .await
            .unwrap()
            .expect("entry should persist");
        assert_eq!(entry.response, response);
        assert_eq!(entry.key, key("/index.html"));
    }

    #[tokio::test]
    async fn test_put_overwrites_single_file() {
        let (storage, _temp_dir) = create_test_storage();
        storage.put("v1", &key("/"), &Response::new(200, "old")).await.unwrap();
        storage.put("v1", &key("/"), &Response::new(404, "new")).await.unwrap();

        let entries = storage.entries("v1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].response.body, b"new");

        let mut names = Vec::new();
        let mut read_dir = fs::read_dir(storage.root().join("v1")).await.unwrap();
        while let Some(f) = read_dir.next_entry().await.unwrap() {
            names.push(f.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        assert_eq!(names.len(), 2, "no temp files left behind: {:?}", names);
        assert_eq!(names[0], STORE_MARKER);
    }

    #[tokio::test]
    async fn test_tags_and_delete() {
        let (storage, _temp_dir) = create_test_storage();
        storage.open("v2").await.unwrap();
        storage.put("v1", &key("/"), &Response::new(200, "x")).await.unwrap();
        fs::write(storage.root().join("stray.txt"), "ignored").await.unwrap();

        assert_eq!(storage.tags().await.unwrap(), vec!["v1", "v2"]);

        assert!(storage.delete("v1").await.unwrap());
        assert!(!storage.delete("v1").await.unwrap());
        assert_eq!(storage.tags().await.unwrap(), vec!["v2"]);
    }

    #[tokio::test]
    async fn test_foreign_directories_are_not_stores() {
        let (storage, _temp_dir) = create_test_storage();
        storage.open("v1").await.unwrap();
        let foreign = storage.root().join("pip").join("http");
        fs::create_dir_all(&foreign).await.unwrap();
        fs::write(foreign.join("important"), "keep me").await.unwrap();

        assert_eq!(storage.tags().await.unwrap(), vec!["v1"]);
        assert!(!storage.has("pip").await.unwrap());
        assert!(!storage.delete("pip").await.unwrap());
        assert!(foreign.join("important").exists());
    }

    #[tokio::test]
    async fn test_corrupt_entry_skipped_in_listing() {
        let (storage, _temp_dir) = create_test_storage();
        storage.put("v1", &key("/"), &Response::new(200, "ok")).await.unwrap();
        fs::write(storage.root().join("v1").join("broken.json"), "{not json")
            .await
            .unwrap();

        let entries = storage.entries("v1").await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_unsafe_tag_rejected() {
        let (storage, _temp_dir) = create_test_storage();
        assert!(matches!(
            storage.open("../outside").await,
            Err(CacheError::InvalidTag { .. })
        ));
    }
}
