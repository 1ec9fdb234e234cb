//! The merged, fleet-wide view of an attack.

use std::fmt;

use crate::error::AggregationError;

/// One row of the approximate percentile table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentile {
    /// Percentile rank (0-based table index).
    pub percentile: usize,
    /// Approximate latency in milliseconds at that rank.
    pub latency_ms: f64,
}

/// Qualitative label for a report, chosen from the mean latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Mean latency under 500 ms.
    Crushed,
    /// 500 ms up to 1000 ms.
    FendedOff,
    /// 1000 ms up to 1500 ms.
    Wounded,
    /// 1500 ms up to 2000 ms.
    Compromised,
    /// 2000 ms and above.
    Annihilated,
}

impl Verdict {
    /// Pick the verdict for a mean latency in milliseconds.
    pub fn from_mean_latency(mean_latency_ms: f64) -> Self {
        if mean_latency_ms < 500.0 {
            Self::Crushed
        } else if mean_latency_ms < 1000.0 {
            Self::FendedOff
        } else if mean_latency_ms < 1500.0 {
            Self::Wounded
        } else if mean_latency_ms < 2000.0 {
            Self::Compromised
        } else {
            Self::Annihilated
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Crushed => "Target crushed bee offensive.",
            Self::FendedOff => "Target successfully fended off the swarm.",
            Self::Wounded => "Target wounded, but operational.",
            Self::Compromised => "Target severely compromised.",
            Self::Annihilated => "Swarm annihilated target.",
        };
        f.write_str(text)
    }
}

/// Totals and latency distribution over every successful node.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackSummary {
    /// Requests completed across the fleet.
    pub total_completed: u64,
    /// Requests failed across the fleet.
    pub total_failed: u64,
    /// Sum of per-node throughput.
    pub requests_per_second: f64,
    /// Unweighted mean of per-node mean latencies.
    pub mean_latency_ms: f64,
    /// Approximate percentile table, ascending.
    pub percentiles: Vec<Percentile>,
    /// Label derived from `mean_latency_ms`.
    pub verdict: Verdict,
}

impl AttackSummary {
    /// Approximate latency at the given percentile rank, if the table has it.
    pub fn latency_at(&self, percentile: usize) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|p| p.percentile == percentile)
            .map(|p| p.latency_ms)
    }
}

/// Result of aggregating every node's outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    /// Nodes that returned metrics.
    pub successful_nodes: usize,
    /// Nodes whose command produced no usable result.
    pub timed_out_nodes: usize,
    /// Nodes that could not be reached or used.
    pub transport_failed_nodes: usize,
    /// Summary, or why there is none.
    pub summary: Result<AttackSummary, AggregationError>,
}

impl AggregateReport {
    /// Total nodes accounted for.
    pub fn node_count(&self) -> usize {
        self.successful_nodes + self.timed_out_nodes + self.transport_failed_nodes
    }

    /// The summary, if any node completed requests.
    pub fn summary(&self) -> Option<&AttackSummary> {
        self.summary.as_ref().ok()
    }
}
