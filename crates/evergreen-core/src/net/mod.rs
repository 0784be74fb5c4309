//! Network access for the offline cache.
//!
//! This module provides the `Network` trait the cache manager fetches
//! through, and `HttpNetwork`, its HTTP implementation.

pub mod client;
pub mod error;

pub use client::{HttpNetwork, Network, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::NetworkError;
