//! Versioned offline response cache.
//!
//! This module provides the `CacheManager`, which keeps one named store per
//! cache version and answers requests network-first with a cached fallback.
//! Stores are created on install, refreshed on every successful fetch, and
//! deleted wholesale when a newer version activates. Entries never expire.
//!
//! Storage backends:
//! - `MemoryStorage`: in-process, shared between clones
//! - `DiskStorage`: one directory per version under a root directory

pub mod disk;
pub mod key;
pub mod manager;
pub mod memory;
pub mod storage;

pub use disk::DiskStorage;
pub use key::{CachePolicy, RequestKey, DEFAULT_CACHEABLE_METHODS};
pub use manager::{CacheManager, ResponseSource, WorkerState};
pub use memory::MemoryStorage;
pub use storage::{CacheStorage, StoredResponse};
