//! What a node does with its slice of the attack.
//!
//! The strategy is picked once, when the coordinator is built. Every run
//! opens its own session, hands it to the variant, and closes it again
//! whatever the outcome, including when the node overruns its deadline.
//! Failures never escape as errors: a broken session becomes
//! [`NodeResult::TransportError`]; missing output or an overrun becomes
//! [`NodeResult::Timeout`].

mod benchmark;
mod browser;

pub use benchmark::BenchmarkStrategy;
pub use browser::BrowserSuiteStrategy;

use std::path::PathBuf;
use std::time::Duration;
use swarm_types::{AttackRequest, Node, NodeResult, StrategyKind};

use crate::remote::{Connector, SshTarget};

/// Directory on each node that receives uploads.
pub(crate) const REMOTE_DIR: &str = "/tmp/honeycomb";

/// Per-node attack strategy.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Run ApacheBench against the target.
    Benchmark(BenchmarkStrategy),
    /// Replay a Selenium suite in a headless browser.
    BrowserSuite(BrowserSuiteStrategy),
}

impl Strategy {
    /// Benchmark with default settings.
    pub fn benchmark() -> Self {
        Self::Benchmark(BenchmarkStrategy::default())
    }

    /// Browser suite uploaded from `suite_dir`, results saved in `results_dir`.
    pub fn browser_suite(suite_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self::BrowserSuite(BrowserSuiteStrategy::new(suite_dir, results_dir))
    }

    /// Which kind of strategy this is.
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Benchmark(_) => StrategyKind::Benchmark,
            Self::BrowserSuite(_) => StrategyKind::BrowserSuite,
        }
    }

    /// Run one node's slice of the attack, giving up after `deadline`.
    pub async fn run(
        &self,
        connector: &dyn Connector,
        target: &SshTarget,
        node: &Node,
        request: &AttackRequest,
        deadline: Duration,
    ) -> NodeResult {
        let session = match connector.open(target).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("{} could not be reached: {}", node, e);
                return NodeResult::transport_error(e.to_string());
            }
        };

        tracing::info!("{} is joining the attack", node);
        let work = async {
            match self {
                Self::Benchmark(benchmark) => benchmark.run_in(session.as_ref(), request).await,
                Self::BrowserSuite(browser) => browser.run_in(session.as_ref(), node, request).await,
            }
        };
        let outcome = tokio::time::timeout(deadline, work).await;

        if let Err(e) = session.close().await {
            tracing::debug!("closing session on {} failed: {}", node, e);
        }

        match outcome {
            Err(_) => {
                tracing::warn!("{} did not report back in {:?}", node, deadline);
                NodeResult::timeout(format!("no result after {}s", deadline.as_secs()))
            }
            Ok(Ok(result)) => {
                if let NodeResult::Timeout { reason } = &result {
                    tracing::warn!("{} lost contact with the target ({})", node, reason);
                } else {
                    tracing::info!("{} is out of ammo", node);
                }
                result
            }
            Ok(Err(e)) => {
                tracing::warn!("{} failed: {}", node, e);
                NodeResult::transport_error(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockConnector;
    use swarm_types::InstanceId;

    const DEADLINE: Duration = Duration::from_secs(60);

    fn node() -> Node {
        Node::new(InstanceId::new("i-1"), "a.test", 0)
    }

    fn request() -> AttackRequest {
        AttackRequest {
            url: "http://target.test/".into(),
            total_requests: 10,
            total_concurrency: 2,
            requests: 10,
            concurrency: 2,
            headers: vec![],
            payload: None,
            strategy: StrategyKind::Benchmark,
        }
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Strategy::benchmark().kind(), StrategyKind::Benchmark);
        assert_eq!(
            Strategy::browser_suite("/suite", "/results").kind(),
            StrategyKind::BrowserSuite
        );
    }

    #[tokio::test]
    async fn unreachable_node_is_transport_error() {
        let connector = MockConnector::new();
        connector.make_unreachable("a.test");
        let target = SshTarget::new("a.test", "ubuntu", "/keys/k.pem");

        let result = Strategy::benchmark()
            .run(&connector, &target, &node(), &request(), DEADLINE)
            .await;
        assert!(matches!(result, NodeResult::TransportError { .. }));
    }

    #[tokio::test]
    async fn session_closed_after_run() {
        let connector = MockConnector::new();
        let target = SshTarget::new("a.test", "ubuntu", "/keys/k.pem");

        // No scripted output: mktemp prints nothing.
        let result = Strategy::benchmark()
            .run(&connector, &target, &node(), &request(), DEADLINE)
            .await;
        assert_eq!(result, NodeResult::timeout("creating csv file"));
        assert_eq!(connector.closed(), vec!["a.test".to_string()]);
    }

    #[tokio::test]
    async fn session_broken_mid_run_is_transport_error() {
        let connector = MockConnector::new();
        connector.break_after_open("a.test");
        let target = SshTarget::new("a.test", "ubuntu", "/keys/k.pem");

        let result = Strategy::benchmark()
            .run(&connector, &target, &node(), &request(), DEADLINE)
            .await;
        assert!(
            matches!(&result, NodeResult::TransportError { detail } if detail.contains("Broken pipe")),
            "{:?}",
            result
        );
        assert_eq!(connector.opened().len(), 1);
        assert_eq!(connector.closed(), vec!["a.test".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_is_timeout_and_session_still_closed() {
        let connector = MockConnector::new();
        connector.delay_on("a.test", Duration::from_secs(120));
        let target = SshTarget::new("a.test", "ubuntu", "/keys/k.pem");

        let result = Strategy::benchmark()
            .run(&connector, &target, &node(), &request(), Duration::from_secs(30))
            .await;
        assert_eq!(result, NodeResult::timeout("no result after 30s"));
        assert_eq!(connector.closed(), vec!["a.test".to_string()]);
        assert_eq!(
            connector.commands(),
            vec![("a.test".to_string(), "mktemp --suffix=.csv".to_string())]
        );
    }
}
