//! Attack coordination.
//!
//! One attack: resolve the fleet, validate and split the totals, warm the
//! target up, run every node's slice concurrently and aggregate whatever
//! comes back. Per-node failures are results, not errors; only failures
//! before dispatch abort the attack.

use std::sync::Arc;
use std::time::Duration;
use swarm_core::{AttackOptions, AttackPlan, Aggregator, ResampleConfig};
use swarm_types::{AggregateReport, Node, NodeResult};

use crate::controller::FleetController;
use crate::error::Result;
use crate::provider::Provider;
use crate::registry::FleetRegistry;
use crate::remote::Connector;
use crate::strategy::Strategy;
use crate::warmup::WarmUp;

/// Coordinator settings.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// Longest a single node may take before it counts as timed out.
    pub node_timeout: Duration,
    /// Percentile resampling sizes.
    pub resample: ResampleConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            node_timeout: Duration::from_secs(3600),
            resample: ResampleConfig::default(),
        }
    }
}

/// One node and what it reported.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutcome {
    /// The node.
    pub node: Node,
    /// Its result.
    pub result: NodeResult,
}

/// Everything an attack produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackOutcome {
    /// Fleet-wide report.
    pub report: AggregateReport,
    /// Per-node results, in fleet order.
    pub nodes: Vec<NodeOutcome>,
}

/// Runs attacks with the active fleet.
pub struct AttackCoordinator<R: FleetRegistry, P: Provider> {
    fleet: FleetController<R, P>,
    connector: Arc<dyn Connector>,
    strategy: Strategy,
    warmup: Box<dyn WarmUp>,
    config: CoordinatorConfig,
}

impl<R: FleetRegistry, P: Provider> AttackCoordinator<R, P> {
    /// Create a coordinator.
    pub fn new(
        fleet: FleetController<R, P>,
        connector: Arc<dyn Connector>,
        strategy: Strategy,
        warmup: Box<dyn WarmUp>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            fleet,
            connector,
            strategy,
            warmup,
            config,
        }
    }

    /// The fleet controller in use.
    pub fn fleet(&self) -> &FleetController<R, P> {
        &self.fleet
    }

    /// Attack `url` with `total_requests` requests at `total_concurrency`
    /// spread across the fleet.
    pub async fn attack(
        &self,
        url: &str,
        total_requests: u64,
        total_concurrency: u64,
        mut options: AttackOptions,
    ) -> Result<AttackOutcome> {
        let (record, nodes) = self.fleet.nodes().await?;
        options.strategy = self.strategy.kind();
        let plan = AttackPlan::new(url, total_requests, total_concurrency, nodes.len(), options)?;

        tracing::info!("Read {} bees from the roster.", nodes.len());
        tracing::info!("Stinging URL so it will be cached for the attack.");
        self.warmup.warm(plan.url(), &plan.options().headers).await?;

        tracing::info!(
            "Organizing the swarm: {} requests, {} at a time, across {} bees.",
            total_requests,
            total_concurrency,
            plan.node_count()
        );

        let mut handles = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let request = plan.request_for(node.index);
            let target = self.fleet.target_for(&record, node);
            let connector = Arc::clone(&self.connector);
            let strategy = self.strategy.clone();
            let node = node.clone();
            let node_timeout = self.config.node_timeout;

            handles.push(tokio::spawn(async move {
                if node.address.is_empty() {
                    return NodeResult::transport_error(format!("{} has no public address", node));
                }
                strategy
                    .run(connector.as_ref(), &target, &node, &request, node_timeout)
                    .await
            }));
        }

        let mut outcomes = Vec::with_capacity(nodes.len());
        for (node, handle) in nodes.into_iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!("{} task failed: {}", node, e);
                    NodeResult::transport_error(e.to_string())
                }
            };
            outcomes.push(NodeOutcome { node, result });
        }

        tracing::info!("Offensive complete.");
        let results: Vec<NodeResult> = outcomes.iter().map(|o| o.result.clone()).collect();
        let report = Aggregator::new(self.config.resample).aggregate(&results, &mut rand::thread_rng());

        Ok(AttackOutcome {
            report,
            nodes: outcomes,
        })
    }
}
