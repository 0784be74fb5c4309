//! Network backends for the offline cache.
//!
//! `Network` is the fetch boundary the cache manager talks to; `HttpNetwork`
//! implements it over a shared `reqwest::Client`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use super::NetworkError;
use crate::models::{Request, Response, ResponseKind};

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP request timeout in seconds.
/// This is the only timeout applied to intercepted requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Performs a request over the network.
///
/// Any HTTP response, whatever its status, is `Ok`; `Err` means no response
/// was obtained at all.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// HTTP network backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
}

impl HttpNetwork {
    pub fn new() -> Result<Self, NetworkError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, NetworkError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn build_headers(request: &Request) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        for (name, value) in &request.headers {
            match (
                header::HeaderName::from_bytes(name.as_bytes()),
                header::HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => debug!(header = %name, "Dropping invalid request header"),
            }
        }
        headers
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(Self::build_headers(request));
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(method = %request.method, url = %request.url, status, "Fetched from network");

        Ok(Response {
            status,
            headers,
            body,
            kind: ResponseKind::Basic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_invalid_headers_dropped() {
        let request = Request::get(Url::parse("http://localhost/").unwrap())
            .with_header("accept", "text/html")
            .with_header("bad header", "x")
            .with_header("x-ok", "line\nbreak");

        let headers = HttpNetwork::build_headers(&request);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("accept").unwrap(), "text/html");
    }
}
