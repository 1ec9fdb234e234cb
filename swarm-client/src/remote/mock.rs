//! Mock connector for testing.
//!
//! Scripts command output per host, can make hosts unreachable or slow, and
//! records every command and file transfer for verification.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Connector, ExecOutput, RemoteError, Session, SshTarget};

/// Mock connector for testing.
#[derive(Debug, Default)]
pub struct MockConnector {
    inner: Arc<Mutex<MockConnectorInner>>,
}

#[derive(Debug)]
struct ExecRule {
    /// `None` matches every host.
    host: Option<String>,
    needle: String,
    output: ExecOutput,
}

#[derive(Debug, Default)]
struct MockConnectorInner {
    rules: Vec<ExecRule>,
    files: Vec<(String, String)>,
    unreachable: BTreeSet<String>,
    delays: BTreeMap<String, Duration>,
    broken_after_open: BTreeSet<String>,
    opened: Vec<SshTarget>,
    commands: Vec<(String, String)>,
    uploads: Vec<(String, PathBuf, String)>,
    downloads: Vec<(String, String, PathBuf)>,
    closed: Vec<String>,
}

impl MockConnectorInner {
    fn output_for(&self, host: &str, command: &str) -> ExecOutput {
        let host_rule = self
            .rules
            .iter()
            .rev()
            .find(|r| r.host.as_deref() == Some(host) && command.contains(&r.needle));
        let any_rule = || {
            self.rules
                .iter()
                .rev()
                .find(|r| r.host.is_none() && command.contains(&r.needle))
        };
        host_rule
            .or_else(any_rule)
            .map(|r| r.output.clone())
            .unwrap_or_default()
    }
}

impl MockConnector {
    /// Create a connector where every host is reachable and every command
    /// succeeds with empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands containing `needle` print `stdout` on every host.
    pub fn respond(&self, needle: &str, stdout: &str) {
        self.add_rule(None, needle, stdout, 0);
    }

    /// Commands containing `needle` print `stdout` on `host` only.
    pub fn respond_on(&self, host: &str, needle: &str, stdout: &str) {
        self.add_rule(Some(host), needle, stdout, 0);
    }

    /// Commands containing `needle` exit with `exit_code` on every host.
    pub fn exit_with(&self, needle: &str, exit_code: i32) {
        self.add_rule(None, needle, "", exit_code);
    }

    fn add_rule(&self, host: Option<&str>, needle: &str, stdout: &str, exit_code: i32) {
        let mut inner = self.inner.lock().unwrap();
        inner.rules.push(ExecRule {
            host: host.map(str::to_string),
            needle: needle.to_string(),
            output: ExecOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_code,
            },
        });
    }

    /// Downloads of remote paths containing `needle` produce `content`.
    pub fn serve_file(&self, needle: &str, content: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.files.push((needle.to_string(), content.to_string()));
    }

    /// Opening a session to `host` fails.
    pub fn make_unreachable(&self, host: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.unreachable.insert(host.to_string());
    }

    /// Sessions to `host` open but every later call fails.
    pub fn break_after_open(&self, host: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.broken_after_open.insert(host.to_string());
    }

    /// Every command on `host` takes `delay` before answering.
    pub fn delay_on(&self, host: &str, delay: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.delays.insert(host.to_string(), delay);
    }

    /// Targets sessions were opened to.
    pub fn opened(&self) -> Vec<SshTarget> {
        self.inner.lock().unwrap().opened.clone()
    }

    /// Every `(host, command)` executed.
    pub fn commands(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().commands.clone()
    }

    /// Commands executed on `host`.
    pub fn commands_on(&self, host: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .commands
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Every `(host, local, remote)` upload.
    pub fn uploads(&self) -> Vec<(String, PathBuf, String)> {
        self.inner.lock().unwrap().uploads.clone()
    }

    /// Every `(host, remote, local)` download.
    pub fn downloads(&self) -> Vec<(String, String, PathBuf)> {
        self.inner.lock().unwrap().downloads.clone()
    }

    /// Hosts whose sessions were closed.
    pub fn closed(&self) -> Vec<String> {
        self.inner.lock().unwrap().closed.clone()
    }
}

impl Clone for MockConnector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, target: &SshTarget) -> Result<Box<dyn Session>, RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.unreachable.contains(&target.host) {
            return Err(RemoteError::Connect {
                host: target.host.clone(),
                detail: "Connection refused".to_string(),
            });
        }
        inner.opened.push(target.clone());
        Ok(Box::new(MockSession {
            host: target.host.clone(),
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MockSession {
    host: String,
    inner: Arc<Mutex<MockConnectorInner>>,
}

impl MockSession {
    fn check_usable(&self) -> Result<(), RemoteError> {
        let inner = self.inner.lock().unwrap();
        if inner.broken_after_open.contains(&self.host) {
            return Err(RemoteError::Connect {
                host: self.host.clone(),
                detail: "Broken pipe".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Session for MockSession {
    async fn exec(&self, command: &str) -> Result<ExecOutput, RemoteError> {
        self.check_usable()?;
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            inner
                .commands
                .push((self.host.clone(), command.to_string()));
            inner.delays.get(&self.host).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let inner = self.inner.lock().unwrap();
        Ok(inner.output_for(&self.host, command))
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        self.check_usable()?;
        let mut inner = self.inner.lock().unwrap();
        inner
            .uploads
            .push((self.host.clone(), local.to_path_buf(), remote.to_string()));
        Ok(())
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<(), RemoteError> {
        self.check_usable()?;
        let content = {
            let mut inner = self.inner.lock().unwrap();
            inner
                .downloads
                .push((self.host.clone(), remote.to_string(), local.to_path_buf()));
            inner
                .files
                .iter()
                .rev()
                .find(|(needle, _)| remote.contains(needle.as_str()))
                .map(|(_, content)| content.clone())
                .unwrap_or_default()
        };
        tokio::fs::write(local, content)
            .await
            .map_err(|e| RemoteError::Transfer(e.to_string()))
    }

    async fn close(&self) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.closed.push(self.host.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(host: &str) -> SshTarget {
        SshTarget::new(host, "ubuntu", "/keys/k.pem")
    }

    #[tokio::test]
    async fn host_rules_take_precedence() {
        let connector = MockConnector::new();
        connector.respond("ab -r", "generic");
        connector.respond_on("b.test", "ab -r", "special");

        let a = connector.open(&target("a.test")).await.unwrap();
        let b = connector.open(&target("b.test")).await.unwrap();

        assert_eq!(a.exec("ab -r -n 10").await.unwrap().stdout, "generic");
        assert_eq!(b.exec("ab -r -n 10").await.unwrap().stdout, "special");
        assert_eq!(a.exec("uptime").await.unwrap(), ExecOutput::default());
        assert_eq!(connector.commands_on("a.test").len(), 2);
    }

    #[tokio::test]
    async fn unreachable_host_fails_open() {
        let connector = MockConnector::new();
        connector.make_unreachable("down.test");
        let result = connector.open(&target("down.test")).await;
        assert!(matches!(result, Err(RemoteError::Connect { .. })));
        assert!(connector.opened().is_empty());
    }

    #[tokio::test]
    async fn download_writes_served_content() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("out.html");
        let connector = MockConnector::new();
        connector.serve_file("results.html", "<td>passed</td>");

        let session = connector.open(&target("a.test")).await.unwrap();
        session
            .download("/tmp/honeycomb/results.html", &local)
            .await
            .unwrap();
        session.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&local).unwrap(), "<td>passed</td>");
        assert_eq!(connector.closed(), vec!["a.test".to_string()]);
    }

    #[tokio::test]
    async fn broken_session_fails_calls() {
        let connector = MockConnector::new();
        connector.break_after_open("a.test");
        let session = connector.open(&target("a.test")).await.unwrap();
        assert!(session.exec("true").await.is_err());
    }
}
