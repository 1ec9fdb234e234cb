//! What a node reports back after its slice of an attack.

use serde::{Deserialize, Serialize};

/// One point of a node's latency distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySample {
    /// Latency in milliseconds.
    pub latency_ms: f64,
    /// Weight attached by the producer (the benchmark reports the
    /// percentage of requests served within `latency_ms`).
    pub weight: f64,
}

impl LatencySample {
    /// Create a sample.
    pub fn new(latency_ms: f64, weight: f64) -> Self {
        Self { latency_ms, weight }
    }
}

/// Counters and latency samples from one node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeMetrics {
    /// Requests that completed.
    pub completed: u64,
    /// Requests that failed.
    pub failed: u64,
    /// Mean time per request in milliseconds.
    pub mean_latency_ms: f64,
    /// Throughput in requests per second.
    pub requests_per_second: f64,
    /// Latency samples in the order the node produced them.
    pub samples: Vec<LatencySample>,
}

impl NodeMetrics {
    /// Metrics for a run that contributes to node counts only.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Outcome of one node's run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeResult {
    /// The node ran its slice and produced usable metrics.
    Success(NodeMetrics),
    /// The remote command ran but produced no usable result.
    Timeout {
        /// Which step came back empty.
        reason: String,
    },
    /// The remote session could not be established or used.
    TransportError {
        /// Error detail.
        detail: String,
    },
}

impl NodeResult {
    /// Build a timeout result.
    pub fn timeout(reason: impl Into<String>) -> Self {
        Self::Timeout {
            reason: reason.into(),
        }
    }

    /// Build a transport failure result.
    pub fn transport_error(detail: impl Into<String>) -> Self {
        Self::TransportError {
            detail: detail.into(),
        }
    }

    /// Metrics if the run succeeded.
    pub fn metrics(&self) -> Option<&NodeMetrics> {
        match self {
            Self::Success(metrics) => Some(metrics),
            _ => None,
        }
    }

    /// True if the run succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
