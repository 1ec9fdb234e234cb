//! ApacheBench strategy.

use swarm_core::{parse_benchmark_summary, parse_latency_csv};
use swarm_types::{AttackRequest, NodeMetrics, NodeResult};

use super::REMOTE_DIR;
use crate::remote::{shell_quote, RemoteError, Session};

/// Runs `ab` on the node and reads back its summary and percentile CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkStrategy {
    /// Cookie sent with every request.
    pub cookie: String,
}

impl Default for BenchmarkStrategy {
    fn default() -> Self {
        Self {
            cookie: "sessionid=NotARealSessionID".to_string(),
        }
    }
}

impl BenchmarkStrategy {
    pub(super) async fn run_in(
        &self,
        session: &dyn Session,
        request: &AttackRequest,
    ) -> Result<NodeResult, RemoteError> {
        let csv_path = session.exec("mktemp --suffix=.csv").await?.stdout;
        let csv_path = csv_path.trim();
        if csv_path.is_empty() {
            return Ok(NodeResult::timeout("creating csv file"));
        }

        if let Some(payload) = &request.payload {
            session.upload(&payload.path, REMOTE_DIR).await?;
        }

        let output = session.exec(&self.command(request, csv_path)).await?;
        let summary = match parse_benchmark_summary(&output.stdout) {
            Ok(summary) => summary,
            Err(e) => return Ok(NodeResult::timeout(format!("running ab: {}", e))),
        };

        let csv = session.exec(&format!("cat {}", shell_quote(csv_path))).await?;
        let samples = match parse_latency_csv(&csv.stdout) {
            Ok(samples) => samples,
            Err(e) => return Ok(NodeResult::timeout(format!("reading csv: {}", e))),
        };

        Ok(NodeResult::Success(NodeMetrics {
            completed: summary.completed,
            failed: summary.failed,
            mean_latency_ms: summary.mean_latency_ms,
            requests_per_second: summary.requests_per_second,
            samples,
        }))
    }

    /// The `ab` command line for one node.
    pub fn command(&self, request: &AttackRequest, csv_path: &str) -> String {
        let mut command = format!(
            "ab -r -n {} -c {} -C {}",
            request.requests,
            request.concurrency,
            shell_quote(&self.cookie)
        );
        for header in &request.headers {
            command.push_str(" -H ");
            command.push_str(&shell_quote(&header.to_string()));
        }
        command.push_str(" -e ");
        command.push_str(&shell_quote(csv_path));
        if let Some(payload) = &request.payload {
            command.push_str(" -k -T ");
            command.push_str(&shell_quote(&format!("{}; charset=UTF-8", payload.mime_type)));
            command.push_str(" -p ");
            command.push_str(REMOTE_DIR);
        }
        command.push(' ');
        command.push_str(&shell_quote(&request.url));
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{Connector, MockConnector, SshTarget};
    use swarm_types::{Header, Payload, StrategyKind};

    const AB_OUTPUT: &str = "\
Server Software:        nginx
Concurrency Level:      2
Complete requests:      10
Failed requests:        1
Requests per second:    250.50 [#/sec] (mean)
Time per request:       7.984 [ms] (mean)
Time per request:       3.992 [ms] (mean, across all concurrent requests)
";

    const AB_CSV: &str = "\
Percentage served,Time in ms
0,3.100
50,7.500
99,20.250
";

    fn request() -> AttackRequest {
        AttackRequest {
            url: "http://target.test/path?q=1".into(),
            total_requests: 40,
            total_concurrency: 8,
            requests: 10,
            concurrency: 2,
            headers: vec![],
            payload: None,
            strategy: StrategyKind::Benchmark,
        }
    }

    async fn run(connector: &MockConnector, request: &AttackRequest) -> NodeResult {
        let session = connector
            .open(&SshTarget::new("a.test", "ubuntu", "/keys/k.pem"))
            .await
            .unwrap();
        BenchmarkStrategy::default()
            .run_in(session.as_ref(), request)
            .await
            .unwrap()
    }

    #[test]
    fn command_for_plain_get() {
        let command = BenchmarkStrategy::default().command(&request(), "/tmp/tmp.x.csv");
        assert_eq!(
            command,
            "ab -r -n 10 -c 2 -C 'sessionid=NotARealSessionID' -e '/tmp/tmp.x.csv' 'http://target.test/path?q=1'"
        );
    }

    #[test]
    fn command_with_headers_and_payload() {
        let mut request = request();
        request.headers = vec![Header::new("Host", "example.com"), Header::new("X-Bee", "1")];
        request.payload = Some(Payload {
            path: "/home/me/body.json".into(),
            mime_type: "application/json".into(),
        });
        let command = BenchmarkStrategy::default().command(&request, "/tmp/c.csv");
        assert!(command.contains(" -H 'Host: example.com' -H 'X-Bee: 1'"));
        assert!(command.contains(" -k -T 'application/json; charset=UTF-8' -p /tmp/honeycomb "));
        assert!(command.ends_with("'http://target.test/path?q=1'"));
    }

    #[tokio::test]
    async fn successful_run_collects_metrics_and_samples() {
        let connector = MockConnector::new();
        connector.respond("mktemp", "/tmp/tmp.abc.csv\n");
        connector.respond("ab -r", AB_OUTPUT);
        connector.respond("cat '/tmp/tmp.abc.csv'", AB_CSV);

        let result = run(&connector, &request()).await;
        let metrics = result.metrics().expect("success");
        assert_eq!(metrics.completed, 10);
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.mean_latency_ms, 7.984);
        assert_eq!(metrics.requests_per_second, 250.50);
        assert_eq!(metrics.samples.len(), 3);
        assert_eq!(metrics.samples[2].latency_ms, 20.25);
    }

    #[tokio::test]
    async fn payload_uploaded_before_attack() {
        let connector = MockConnector::new();
        connector.respond("mktemp", "/tmp/t.csv");
        connector.respond("ab -r", AB_OUTPUT);
        connector.respond("cat", AB_CSV);

        let mut request = request();
        request.payload = Some(Payload {
            path: "/home/me/body.json".into(),
            mime_type: "application/json".into(),
        });
        assert!(run(&connector, &request).await.is_success());

        let uploads = connector.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].2, "/tmp/honeycomb");
    }

    #[tokio::test]
    async fn missing_summary_is_timeout() {
        let connector = MockConnector::new();
        connector.respond("mktemp", "/tmp/t.csv");
        connector.respond("ab -r", "apr_socket_connect(): Connection refused (111)");

        let result = run(&connector, &request()).await;
        assert!(matches!(result, NodeResult::Timeout { reason } if reason.starts_with("running ab")));
    }

    #[tokio::test]
    async fn empty_csv_is_timeout() {
        let connector = MockConnector::new();
        connector.respond("mktemp", "/tmp/t.csv");
        connector.respond("ab -r", AB_OUTPUT);
        connector.respond("cat", "Percentage served,Time in ms\n");

        let result = run(&connector, &request()).await;
        assert!(matches!(result, NodeResult::Timeout { reason } if reason.starts_with("reading csv")));
    }

    #[tokio::test]
    async fn failing_ab_is_timeout() {
        let connector = MockConnector::new();
        connector.respond("mktemp", "/tmp/t.csv");
        connector.exit_with("ab -r", 22);

        let result = run(&connector, &request()).await;
        assert!(matches!(result, NodeResult::Timeout { reason } if reason.starts_with("running ab")));
        assert!(!connector.commands_on("a.test").iter().any(|c| c.starts_with("cat ")));
    }
}
