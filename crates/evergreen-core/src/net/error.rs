use thiserror::Error;

/// A network-level failure: no HTTP response was obtained.
///
/// HTTP error statuses are not failures at this layer.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Network error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            NetworkError::Timeout(message)
        } else if err.is_connect() {
            NetworkError::Connect(message)
        } else if err.is_body() || err.is_decode() {
            NetworkError::Body(message)
        } else {
            NetworkError::Transport(message)
        }
    }
}
