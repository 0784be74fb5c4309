use reqwest::Method;
use url::Url;

use crate::error::{CacheError, CacheResult};

/// An outgoing request issued by the dashboard page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Build a request, normalizing the method to upper case.
    ///
    /// `Method::from_bytes` keeps unknown casings as extension methods, so
    /// `"get"` would otherwise never match `GET`.
    pub fn new(method: &str, url: Url) -> CacheResult<Self> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| CacheError::InvalidRequest(format!("bad method {:?}", method)))?;
        Ok(Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Resolve `path` against `origin` and build a request for it.
    pub fn for_path(method: &str, origin: &Url, path: &str) -> CacheResult<Self> {
        let url = origin
            .join(path)
            .map_err(|e| CacheError::InvalidRequest(format!("{}: {}", path, e)))?;
        Self::new(method, url)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}
