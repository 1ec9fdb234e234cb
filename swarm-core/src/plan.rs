//! Attack sizing: validation and the per-node split.
//!
//! An attack is described by fleet-wide totals. Before anything is
//! dispatched the totals are checked against the fleet size, then divided
//! evenly with any remainder going to the lowest-indexed nodes.

use swarm_types::{AttackRequest, Header, Payload, StrategyKind};
use thiserror::Error;

/// A fleet-wide total that cannot be split across the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// There are no nodes to split across.
    #[error("the fleet has no nodes")]
    EmptyFleet,

    /// `total_requests < 2 * nodes`.
    #[error("the total number of requests must be at least {required} (2x num. instances), got {actual}")]
    TooFewRequests {
        /// Minimum accepted request count.
        required: u64,
        /// Requested count.
        actual: u64,
    },

    /// `total_concurrency < nodes`.
    #[error("the number of concurrent requests must be at least {required} (num. instances), got {actual}")]
    TooLittleConcurrency {
        /// Minimum accepted concurrency.
        required: u64,
        /// Requested concurrency.
        actual: u64,
    },

    /// `total_concurrency > total_requests`.
    #[error("the number of concurrent requests ({concurrency}) must be at most the same as number of requests ({requests})")]
    ConcurrencyExceedsRequests {
        /// Requested concurrency.
        concurrency: u64,
        /// Requested count.
        requests: u64,
    },
}

/// Everything about an attack that is not a count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttackOptions {
    /// Headers added to every request.
    pub headers: Vec<Header>,
    /// Optional request body.
    pub payload: Option<Payload>,
    /// Which strategy each node runs.
    pub strategy: StrategyKind,
}

/// A validated attack, ready to be split into per-node requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackPlan {
    url: String,
    total_requests: u64,
    total_concurrency: u64,
    node_count: usize,
    options: AttackOptions,
}

impl AttackPlan {
    /// Validate the totals against the fleet size and build a plan.
    pub fn new(
        url: impl Into<String>,
        total_requests: u64,
        total_concurrency: u64,
        node_count: usize,
        options: AttackOptions,
    ) -> Result<Self, ValidationError> {
        Self::validate(node_count, total_requests, total_concurrency)?;
        Ok(Self {
            url: url.into(),
            total_requests,
            total_concurrency,
            node_count,
            options,
        })
    }

    /// Check the totals against the fleet size.
    ///
    /// Constraints are checked in a fixed order and the first violation is
    /// reported.
    pub fn validate(
        node_count: usize,
        total_requests: u64,
        total_concurrency: u64,
    ) -> Result<(), ValidationError> {
        if node_count == 0 {
            return Err(ValidationError::EmptyFleet);
        }
        let nodes = node_count as u64;
        if total_requests < nodes.saturating_mul(2) {
            return Err(ValidationError::TooFewRequests {
                required: nodes.saturating_mul(2),
                actual: total_requests,
            });
        }
        if total_concurrency < nodes {
            return Err(ValidationError::TooLittleConcurrency {
                required: nodes,
                actual: total_concurrency,
            });
        }
        if total_concurrency > total_requests {
            return Err(ValidationError::ConcurrencyExceedsRequests {
                concurrency: total_concurrency,
                requests: total_requests,
            });
        }
        Ok(())
    }

    /// Number of nodes the plan is split across.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Attack options shared by every node.
    pub fn options(&self) -> &AttackOptions {
        &self.options
    }

    /// The request for node `index`.
    pub fn request_for(&self, index: usize) -> AttackRequest {
        AttackRequest {
            url: self.url.clone(),
            total_requests: self.total_requests,
            total_concurrency: self.total_concurrency,
            requests: split_evenly(self.total_requests, self.node_count, index),
            concurrency: split_evenly(self.total_concurrency, self.node_count, index),
            headers: self.options.headers.clone(),
            payload: self.options.payload.clone(),
            strategy: self.options.strategy,
        }
    }

    /// One request per node, in node order.
    pub fn requests(&self) -> Vec<AttackRequest> {
        (0..self.node_count).map(|i| self.request_for(i)).collect()
    }
}

/// Share of `total` for part `index` of `parts`.
///
/// Every part gets `total / parts`; the first `total % parts` parts get one
/// more. Returns 0 when `parts` is 0 or `index` is out of range.
pub fn split_evenly(total: u64, parts: usize, index: usize) -> u64 {
    if parts == 0 || index >= parts {
        return 0;
    }
    let parts = parts as u64;
    let base = total / parts;
    let remainder = total % parts;
    if (index as u64) < remainder {
        base + 1
    } else {
        base
    }
}
