//! Evergreen offline cache.
//!
//! A versioned cache-then-network response cache for the Evergreen admin
//! dashboard. A `CacheManager` owns one cache version: `install` fills its
//! store with the asset manifest, `activate` deletes the stores of every
//! other version, and `handle` answers requests from the network while
//! falling back to the last stored response when the network is down.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod net;
pub mod utils;

pub use cache::{
    CacheManager, CachePolicy, CacheStorage, DiskStorage, MemoryStorage, RequestKey,
    ResponseSource, StoredResponse, WorkerState,
};
pub use config::Config;
pub use error::{CacheError, CacheResult};
pub use models::{Request, Response, ResponseKind};
pub use net::{HttpNetwork, Network, NetworkError};
