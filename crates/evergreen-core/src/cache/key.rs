use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Request;

/// Methods cached when no explicit allow-list is configured.
pub const DEFAULT_CACHEABLE_METHODS: &[&str] = &["GET", "HEAD"];

/// Normalized request identity: upper-case method plus URL without fragment.
///
/// The URL parser already lowercases scheme and host and drops default
/// ports; query strings stay significant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    method: String,
    url: String,
}

impl RequestKey {
    pub fn from_request(request: &Request) -> Self {
        let mut url = request.url.clone();
        url.set_fragment(None);
        Self {
            method: request.method.as_str().to_ascii_uppercase(),
            url: url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Which intercepted requests may be looked up in and written to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    methods: BTreeSet<String>,
    excluded_paths: Vec<String>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CACHEABLE_METHODS.iter().copied(), std::iter::empty::<&str>())
    }
}

impl CachePolicy {
    pub fn new<M, P>(methods: M, excluded_paths: P) -> Self
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        Self {
            methods: methods
                .into_iter()
                .map(|m| m.as_ref().to_ascii_uppercase())
                .collect(),
            excluded_paths: excluded_paths
                .into_iter()
                .map(|p| p.as_ref().to_string())
                .collect(),
        }
    }

    pub fn allows(&self, request: &Request) -> bool {
        if !self.methods.contains(request.method.as_str()) {
            return false;
        }
        let path = request.url.path();
        !self
            .excluded_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(String::as_str)
    }
}
