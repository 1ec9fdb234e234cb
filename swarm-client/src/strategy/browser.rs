//! Selenium browser-suite strategy.
//!
//! The suite bundle (runner jar, suite file and its test cases) is uploaded
//! to every node. The runner is started once per request under a virtual
//! display and each run's HTML report is copied back to
//! `<results_dir>/results_<node>_<run>.html`.

use std::path::{Path, PathBuf};
use swarm_types::{AttackRequest, Node, NodeMetrics, NodeResult};

use super::REMOTE_DIR;
use crate::remote::{shell_quote, RemoteError, Session};

/// Replays a browser suite on the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSuiteStrategy {
    /// Local directory holding the suite bundle.
    pub suite_dir: PathBuf,
    /// Local directory receiving the downloaded reports.
    pub results_dir: PathBuf,
    /// Runner jar inside the bundle.
    pub runner_jar: String,
    /// Suite file inside the bundle.
    pub suite_file: String,
    /// Browser the runner drives.
    pub browser: String,
}

impl BrowserSuiteStrategy {
    /// Strategy with the stock runner and suite names.
    pub fn new(suite_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            suite_dir: suite_dir.into(),
            results_dir: results_dir.into(),
            runner_jar: "selenium-server-standalone-2.33.0.jar".to_string(),
            suite_file: "Suite1.html".to_string(),
            browser: "*firefox".to_string(),
        }
    }

    /// Local path of the report for `run` on the node with `index`.
    pub fn result_path(&self, index: usize, run: u64) -> PathBuf {
        self.results_dir
            .join(format!("results_{}_{}.html", index, run))
    }

    /// The runner command line.
    pub fn command(&self, url: &str) -> String {
        format!(
            "DISPLAY=:1 xvfb-run java -jar {dir}/{jar} -htmlSuite {browser} {url} {dir}/{suite} {dir}/results.html",
            dir = REMOTE_DIR,
            jar = self.runner_jar,
            browser = shell_quote(&self.browser),
            url = shell_quote(url),
            suite = self.suite_file,
        )
    }

    pub(super) async fn run_in(
        &self,
        session: &dyn Session,
        node: &Node,
        request: &AttackRequest,
    ) -> Result<NodeResult, RemoteError> {
        session.exec(&format!("mkdir -p {}", REMOTE_DIR)).await?;

        for file in bundle_files(&self.suite_dir).await? {
            session.upload(&file, REMOTE_DIR).await?;
        }

        let remote_report = format!("{}/results.html", REMOTE_DIR);
        let command = self.command(&request.url);
        for run in 0..request.requests {
            let output = session.exec(&command).await?;
            if !output.success() {
                tracing::debug!(
                    "{} suite run {} exited with {}",
                    node,
                    run,
                    output.exit_code
                );
            }
            session
                .download(&remote_report, &self.result_path(node.index, run))
                .await?;
        }

        Ok(NodeResult::Success(NodeMetrics::empty()))
    }
}

/// Regular files directly inside `dir`, sorted by name.
async fn bundle_files(dir: &Path) -> Result<Vec<PathBuf>, RemoteError> {
    let unreadable = |e: std::io::Error| {
        RemoteError::Transfer(format!("suite bundle {}: {}", dir.display(), e))
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        if entry.file_type().await.map_err(unreadable)?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{Connector, MockConnector, SshTarget};
    use swarm_types::{InstanceId, StrategyKind};

    fn request(runs: u64) -> AttackRequest {
        AttackRequest {
            url: "http://target.test/".into(),
            total_requests: runs * 2,
            total_concurrency: 2,
            requests: runs,
            concurrency: 1,
            headers: vec![],
            payload: None,
            strategy: StrategyKind::BrowserSuite,
        }
    }

    #[test]
    fn command_targets_url() {
        let strategy = BrowserSuiteStrategy::new("/suite", "/results");
        assert_eq!(
            strategy.command("http://target.test/"),
            "DISPLAY=:1 xvfb-run java -jar /tmp/honeycomb/selenium-server-standalone-2.33.0.jar \
             -htmlSuite '*firefox' 'http://target.test/' /tmp/honeycomb/Suite1.html /tmp/honeycomb/results.html"
        );
    }

    #[test]
    fn result_paths_name_node_and_run() {
        let strategy = BrowserSuiteStrategy::new("/suite", "/results");
        assert_eq!(
            strategy.result_path(3, 1),
            PathBuf::from("/results/results_3_1.html")
        );
    }

    #[tokio::test]
    async fn uploads_bundle_and_downloads_each_run() {
        let suite = tempfile::tempdir().unwrap();
        let results = tempfile::tempdir().unwrap();
        std::fs::write(suite.path().join("Suite1.html"), "<suite/>").unwrap();
        std::fs::write(suite.path().join("login.html"), "<case/>").unwrap();
        std::fs::create_dir(suite.path().join("nested")).unwrap();

        let connector = MockConnector::new();
        connector.serve_file("results.html", "<td>passed</td>");
        let session = connector
            .open(&SshTarget::new("a.test", "ubuntu", "/keys/k.pem"))
            .await
            .unwrap();

        let strategy = BrowserSuiteStrategy::new(suite.path(), results.path());
        let node = Node::new(InstanceId::new("i-1"), "a.test", 2);
        let result = strategy
            .run_in(session.as_ref(), &node, &request(3))
            .await
            .unwrap();

        assert_eq!(result, NodeResult::Success(NodeMetrics::empty()));
        assert_eq!(connector.uploads().len(), 2);
        assert_eq!(connector.downloads().len(), 3);
        for run in 0..3 {
            assert!(results
                .path()
                .join(format!("results_2_{}.html", run))
                .exists());
        }
        let runs = connector
            .commands_on("a.test")
            .iter()
            .filter(|c| c.contains("xvfb-run"))
            .count();
        assert_eq!(runs, 3);
    }

    #[tokio::test]
    async fn missing_bundle_is_error() {
        let connector = MockConnector::new();
        let session = connector
            .open(&SshTarget::new("a.test", "ubuntu", "/keys/k.pem"))
            .await
            .unwrap();
        let strategy = BrowserSuiteStrategy::new("/nonexistent/suite-xyz", "/tmp");
        let node = Node::new(InstanceId::new("i-1"), "a.test", 0);
        let result = strategy.run_in(session.as_ref(), &node, &request(1)).await;
        assert!(matches!(result, Err(RemoteError::Transfer(_))));
    }
}
