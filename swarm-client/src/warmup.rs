//! Pre-attack warm-up request.
//!
//! Before any node is dispatched the target is fetched once, with the
//! attack's headers, from the controlling machine. A failure aborts the
//! attack; it is not retried.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use swarm_types::Header;
use thiserror::Error;

/// Errors from the warm-up request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WarmUpError {
    /// The target could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The target answered with an error status.
    #[error("target answered {0}")]
    Status(u16),

    /// A header could not be sent as given.
    #[error("invalid header {0:?}")]
    InvalidHeader(String),

    /// Any other HTTP failure.
    #[error("http error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for WarmUpError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            WarmUpError::Status(status.as_u16())
        } else if e.is_connect() || e.is_timeout() {
            WarmUpError::ConnectionFailed(e.to_string())
        } else {
            WarmUpError::Http(e.to_string())
        }
    }
}

/// One request to the target before the attack.
#[async_trait]
pub trait WarmUp: Send + Sync {
    /// Fetch `url` with `headers`.
    async fn warm(&self, url: &str, headers: &[Header]) -> Result<(), WarmUpError>;
}

/// Warm-up over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpWarmUp {
    http: reqwest::Client,
}

impl HttpWarmUp {
    /// Create a warm-up client.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WarmUp for HttpWarmUp {
    async fn warm(&self, url: &str, headers: &[Header]) -> Result<(), WarmUpError> {
        let mut request = self.http.get(url);
        for header in headers {
            let name = reqwest::header::HeaderName::from_bytes(header.name.as_bytes())
                .map_err(|_| WarmUpError::InvalidHeader(header.to_string()))?;
            let value = reqwest::header::HeaderValue::from_str(&header.value)
                .map_err(|_| WarmUpError::InvalidHeader(header.to_string()))?;
            request = request.header(name, value);
        }

        tracing::debug!("Warming up {}", url);
        request.send().await?.error_for_status()?;
        Ok(())
    }
}

/// Mock warm-up for testing.
#[derive(Debug, Default)]
pub struct MockWarmUp {
    inner: Arc<Mutex<MockWarmUpInner>>,
}

#[derive(Debug, Default)]
struct MockWarmUpInner {
    calls: Vec<(String, Vec<Header>)>,
    fail_with: Option<WarmUpError>,
}

impl MockWarmUp {
    /// Create a warm-up that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later warm-up fails with `error`.
    pub fn fail_with(&self, error: WarmUpError) {
        self.inner.lock().unwrap().fail_with = Some(error);
    }

    /// Every `(url, headers)` warmed.
    pub fn calls(&self) -> Vec<(String, Vec<Header>)> {
        self.inner.lock().unwrap().calls.clone()
    }
}

impl Clone for MockWarmUp {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl WarmUp for MockWarmUp {
    async fn warm(&self, url: &str, headers: &[Header]) -> Result<(), WarmUpError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push((url.to_string(), headers.to_vec()));
        match &inner.fail_with {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
