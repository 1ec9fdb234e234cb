//! SSH execution primitives.
//!
//! Uses `tokio::process::Command` to shell out to `ssh` and `scp`. Every call
//! authenticates with the fleet's key pair (`-i <key>.pem`); host keys of
//! freshly launched nodes are not checked.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Connector, ExecOutput, RemoteError, Session, SshTarget};

/// ssh exits with 255 when the connection itself fails.
const SSH_CONNECTION_FAILURE: i32 = 255;

/// Opens sessions by shelling out to `ssh`.
#[derive(Debug, Clone)]
pub struct SshConnector {
    connect_timeout_secs: u64,
}

impl SshConnector {
    /// Create a connector with the given connect timeout.
    pub fn new(connect_timeout_secs: u64) -> Self {
        Self {
            connect_timeout_secs,
        }
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new(30)
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn open(&self, target: &SshTarget) -> Result<Box<dyn Session>, RemoteError> {
        let session = SshSession {
            target: target.clone(),
            connect_timeout_secs: self.connect_timeout_secs,
            closed: AtomicBool::new(false),
        };

        // ssh is connectionless from our side; prove the login works up front
        // so an unreachable node is reported before any work is attempted.
        let probe = session.exec("true").await?;
        if !probe.success() {
            return Err(RemoteError::Connect {
                host: target.host.clone(),
                detail: probe.stderr.trim().to_string(),
            });
        }
        tracing::debug!("Opened session to {}", target.login());
        Ok(Box::new(session))
    }
}

/// One node reached over ssh/scp.
#[derive(Debug)]
struct SshSession {
    target: SshTarget,
    connect_timeout_secs: u64,
    closed: AtomicBool,
}

impl SshSession {
    fn common_options(&self) -> Vec<String> {
        vec![
            "-q".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-i".to_string(),
            self.target.key_path.display().to_string(),
        ]
    }

    fn ensure_open(&self) -> Result<(), RemoteError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RemoteError::Closed);
        }
        Ok(())
    }

    async fn scp(&self, from: String, to: String) -> Result<(), RemoteError> {
        self.ensure_open()?;
        let output = tokio::process::Command::new("scp")
            .kill_on_drop(true)
            .args(self.common_options())
            .arg(&from)
            .arg(&to)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RemoteError::Transfer(format!(
                "scp {} -> {} failed: {}",
                from,
                to,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Session for SshSession {
    async fn exec(&self, command: &str) -> Result<ExecOutput, RemoteError> {
        self.ensure_open()?;
        tracing::debug!("[{}] $ {}", self.target.host, command);
        let output = tokio::process::Command::new("ssh")
            .kill_on_drop(true)
            .args(self.common_options())
            .arg(self.target.login())
            .arg(command)
            .output()
            .await?;

        let result = ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        };

        if result.exit_code == SSH_CONNECTION_FAILURE {
            return Err(RemoteError::Connect {
                host: self.target.host.clone(),
                detail: result.stderr.trim().to_string(),
            });
        }
        Ok(result)
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        self.scp(
            local.display().to_string(),
            format!("{}:{}", self.target.login(), remote),
        )
        .await
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<(), RemoteError> {
        self.scp(
            format!("{}:{}", self.target.login(), remote),
            local.display().to_string(),
        )
        .await
    }

    async fn close(&self) -> Result<(), RemoteError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
