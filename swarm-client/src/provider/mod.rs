//! Cloud provider abstraction.
//!
//! The controller needs five calls from the compute provider: resolve
//! security groups, launch, describe, tag and terminate instances.
//! [`AwsCliProvider`] drives EC2 through the `aws` command line tool;
//! [`MockProvider`] scripts the same calls for tests.

mod aws;
mod mock;

pub use aws::AwsCliProvider;
pub use mock::MockProvider;

use async_trait::async_trait;
use std::fmt;
use swarm_types::InstanceId;
use thiserror::Error;

/// Provider errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider tool could not be started.
    #[error("provider spawn error: {0}")]
    Spawn(#[from] std::io::Error),

    /// The provider rejected the call.
    #[error("{operation} failed: {detail}")]
    Rejected {
        /// Which call failed.
        operation: &'static str,
        /// Provider's explanation.
        detail: String,
    },

    /// The provider's response could not be understood.
    #[error("unexpected {operation} response: {detail}")]
    InvalidResponse {
        /// Which call produced it.
        operation: &'static str,
        /// What was wrong.
        detail: String,
    },
}

/// Lifecycle state the provider reports for an instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstanceState {
    /// Booting.
    Pending,
    /// Up and reachable.
    Running,
    /// Termination in progress.
    ShuttingDown,
    /// Gone.
    Terminated,
    /// Stop in progress.
    Stopping,
    /// Stopped.
    Stopped,
    /// Any state name this crate does not know.
    Other(String),
}

impl InstanceState {
    /// Parse a provider state name (`"running"`, `"shutting-down"`, ...).
    pub fn from_name(name: &str) -> Self {
        match name {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "shutting-down" => Self::ShuttingDown,
            "terminated" => Self::Terminated,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }

    /// True once the instance can never reach `Running` again.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::ShuttingDown | Self::Terminated)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::ShuttingDown => write!(f, "shutting-down"),
            Self::Terminated => write!(f, "terminated"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

/// What the provider knows about one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDescription {
    /// Instance identifier.
    pub id: InstanceId,
    /// Current state.
    pub state: InstanceState,
    /// Public DNS name or IP, once assigned.
    pub public_address: Option<String>,
}

/// Parameters for launching the fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Machine image.
    pub image_id: String,
    /// Instance size.
    pub instance_type: String,
    /// Number of instances (exact; the launch is all or nothing).
    pub count: usize,
    /// Key pair installed on every instance.
    pub key_name: String,
    /// Security groups attached to every instance.
    pub security_group_ids: Vec<String>,
    /// Availability zone.
    pub zone: String,
    /// Optional VPC subnet.
    pub subnet: Option<String>,
}

/// Cloud compute provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Look up the ids of the named security groups.
    ///
    /// With a subnet only VPC groups are considered.
    async fn resolve_security_group_ids(
        &self,
        names: &[String],
        subnet: Option<&str>,
    ) -> Result<Vec<String>, ProviderError>;

    /// Launch instances; returns them in launch order.
    async fn launch_instances(
        &self,
        spec: &LaunchSpec,
    ) -> Result<Vec<InstanceDescription>, ProviderError>;

    /// Describe the given instances.
    async fn describe_instances(
        &self,
        ids: &[InstanceId],
    ) -> Result<Vec<InstanceDescription>, ProviderError>;

    /// Attach tags to the given instances.
    async fn tag_instances(
        &self,
        ids: &[InstanceId],
        tags: &[(String, String)],
    ) -> Result<(), ProviderError>;

    /// Request termination; returns the ids the provider confirmed.
    async fn terminate_instances(
        &self,
        ids: &[InstanceId],
    ) -> Result<Vec<InstanceId>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_state_names_roundtrip() {
        for name in [
            "pending",
            "running",
            "shutting-down",
            "terminated",
            "stopping",
            "stopped",
        ] {
            assert_eq!(InstanceState::from_name(name).to_string(), name);
        }
        assert_eq!(
            InstanceState::from_name("rebooting"),
            InstanceState::Other("rebooting".into())
        );
    }

    #[test]
    fn gone_states() {
        assert!(InstanceState::Terminated.is_gone());
        assert!(InstanceState::ShuttingDown.is_gone());
        assert!(!InstanceState::Pending.is_gone());
        assert!(!InstanceState::Stopped.is_gone());
    }
}
