//! Remote execution on fleet nodes.
//!
//! A [`Connector`] opens a [`Session`] to one node; the session runs
//! commands and moves files. Each attack task opens its own session and
//! closes it when done, so sessions are never shared between nodes.

mod mock;
mod ssh;

pub use mock::MockConnector;
pub use ssh::SshConnector;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from remote operations.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The local ssh/scp process could not be started.
    #[error("ssh spawn error: {0}")]
    Spawn(#[from] std::io::Error),

    /// The node could not be reached or refused the login.
    #[error("cannot connect to {host}: {detail}")]
    Connect {
        /// Target host.
        host: String,
        /// Error detail.
        detail: String,
    },

    /// A file transfer failed.
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// The session was used after `close`.
    #[error("session closed")]
    Closed,
}

/// Result of executing a command on a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Exit code (0 = success).
    pub exit_code: i32,
}

impl ExecOutput {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// How to log in to one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    /// Public DNS name or IP address.
    pub host: String,
    /// Login user.
    pub user: String,
    /// Private key file.
    pub key_path: PathBuf,
}

impl SshTarget {
    /// Create a target.
    pub fn new(host: impl Into<String>, user: impl Into<String>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            key_path: key_path.into(),
        }
    }

    /// `user@host`.
    pub fn login(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// An open session on one node.
#[async_trait]
pub trait Session: Send + Sync {
    /// Run a shell command and return its output.
    ///
    /// A non-zero exit from the command itself is not an error; failures to
    /// reach the node are.
    async fn exec(&self, command: &str) -> Result<ExecOutput, RemoteError>;

    /// Copy a local file to the node.
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), RemoteError>;

    /// Copy a file from the node.
    async fn download(&self, remote: &str, local: &Path) -> Result<(), RemoteError>;

    /// Close the session.
    async fn close(&self) -> Result<(), RemoteError>;
}

/// Opens sessions on nodes.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a session to `target`.
    async fn open(&self, target: &SshTarget) -> Result<Box<dyn Session>, RemoteError>;
}

/// Quote `value` for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
