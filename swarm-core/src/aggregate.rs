//! Merging node results into one fleet-wide report.
//!
//! Nodes never ship every request timing back. Each successful node reports
//! a short latency distribution, and the fleet-wide percentile table is
//! rebuilt by resampling: node `i` contributes
//! `floor(completed_i / total_completed * S)` draws (uniform, with
//! replacement) from its own samples, the draws are pooled and sorted, and
//! `K` evenly spaced order statistics become the table.

use rand::Rng;
use swarm_types::{
    AggregateReport, AggregationError, AttackSummary, NodeMetrics, NodeResult, Percentile,
    Verdict,
};

/// Pooled draws used to rebuild the percentile table.
pub const DEFAULT_SAMPLE_BUDGET: usize = 10_000;

/// Rows in the percentile table.
pub const DEFAULT_TABLE_SIZE: usize = 100;

/// Sizes used by the resampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResampleConfig {
    /// Total draws across all nodes (`S`).
    pub sample_budget: usize,
    /// Rows in the percentile table (`K`).
    pub table_size: usize,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            sample_budget: DEFAULT_SAMPLE_BUDGET,
            table_size: DEFAULT_TABLE_SIZE,
        }
    }
}

/// Classifies node results and builds the aggregate report.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    config: ResampleConfig,
}

impl Aggregator {
    /// Create an aggregator with the given resampling sizes.
    pub fn new(config: ResampleConfig) -> Self {
        Self { config }
    }

    /// Build the report for a complete set of node results.
    pub fn aggregate<R: Rng + ?Sized>(&self, results: &[NodeResult], rng: &mut R) -> AggregateReport {
        let mut successes: Vec<&NodeMetrics> = Vec::new();
        let mut timed_out_nodes = 0;
        let mut transport_failed_nodes = 0;

        for result in results {
            match result {
                NodeResult::Success(metrics) => successes.push(metrics),
                NodeResult::Timeout { .. } => timed_out_nodes += 1,
                NodeResult::TransportError { .. } => transport_failed_nodes += 1,
            }
        }

        AggregateReport {
            successful_nodes: successes.len(),
            timed_out_nodes,
            transport_failed_nodes,
            summary: self.summarize(&successes, rng),
        }
    }

    fn summarize<R: Rng + ?Sized>(
        &self,
        successes: &[&NodeMetrics],
        rng: &mut R,
    ) -> Result<AttackSummary, AggregationError> {
        if successes.is_empty() {
            return Err(AggregationError::NoNodeCompleted);
        }

        let total_completed: u64 = successes.iter().map(|m| m.completed).sum();
        if total_completed == 0 {
            return Err(AggregationError::NoCompletedRequests);
        }

        let total_failed = successes.iter().map(|m| m.failed).sum();
        let requests_per_second = successes.iter().map(|m| m.requests_per_second).sum();
        let mean_latency_ms = successes.iter().map(|m| m.mean_latency_ms).sum::<f64>()
            / successes.len() as f64;

        Ok(AttackSummary {
            total_completed,
            total_failed,
            requests_per_second,
            mean_latency_ms,
            percentiles: self.resample(successes, total_completed, rng),
            verdict: Verdict::from_mean_latency(mean_latency_ms),
        })
    }

    /// Rebuild the fleet-wide percentile table from per-node samples.
    ///
    /// Returns an empty table if no node had samples to draw from.
    pub fn resample<R: Rng + ?Sized>(
        &self,
        nodes: &[&NodeMetrics],
        total_completed: u64,
        rng: &mut R,
    ) -> Vec<Percentile> {
        let budget = self.config.sample_budget;
        let table_size = self.config.table_size;
        if total_completed == 0 || table_size == 0 {
            return Vec::new();
        }

        let mut pool: Vec<f64> = Vec::with_capacity(budget);
        for metrics in nodes {
            if metrics.samples.is_empty() {
                continue;
            }
            let draws = draws_for(metrics.completed, total_completed, budget);
            for _ in 0..draws {
                let j = rng.gen_range(0..metrics.samples.len());
                pool.push(metrics.samples[j].latency_ms);
            }
        }

        if pool.is_empty() {
            return Vec::new();
        }
        pool.sort_by(f64::total_cmp);

        (0..table_size)
            .map(|p| Percentile {
                percentile: p,
                latency_ms: pool[p * pool.len() / table_size],
            })
            .collect()
    }
}

/// `floor(completed / total * budget)` without going through floats.
fn draws_for(completed: u64, total: u64, budget: usize) -> usize {
    (completed as u128 * budget as u128 / total as u128) as usize
}
