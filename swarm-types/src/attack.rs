//! Per-node attack requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::HeaderError;

/// What each node does during an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Run the HTTP benchmarking tool and report latency samples.
    #[default]
    Benchmark,
    /// Run a headless browser test suite and collect its result pages.
    BrowserSuite,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Benchmark => write!(f, "benchmark"),
            StrategyKind::BrowserSuite => write!(f, "browser-suite"),
        }
    }
}

/// One HTTP request header sent with every attack request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

impl Header {
    /// Create a header.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Parse a `;`-separated list of `Name: value` headers.
///
/// Empty entries are skipped, so `""` and `"A: 1;"` are both accepted.
/// Only the first `:` splits name from value.
pub fn parse_headers(spec: &str) -> Result<Vec<Header>, HeaderError> {
    spec.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, value) = entry
                .split_once(':')
                .ok_or_else(|| HeaderError::MissingSeparator(entry.to_string()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(HeaderError::EmptyName(entry.to_string()));
            }
            Ok(Header::new(name, value.trim()))
        })
        .collect()
}

/// A request body uploaded to every node and sent with each request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Local file holding the body.
    pub path: PathBuf,
    /// MIME type announced in `Content-Type`.
    pub mime_type: String,
}

/// One node's slice of an attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRequest {
    /// Target URL.
    pub url: String,
    /// Requests across the whole fleet.
    pub total_requests: u64,
    /// Concurrency across the whole fleet.
    pub total_concurrency: u64,
    /// Requests this node sends.
    pub requests: u64,
    /// Concurrency this node uses.
    pub concurrency: u64,
    /// Headers added to every request.
    pub headers: Vec<Header>,
    /// Optional request body.
    pub payload: Option<Payload>,
    /// Which strategy runs the slice.
    pub strategy: StrategyKind,
}
