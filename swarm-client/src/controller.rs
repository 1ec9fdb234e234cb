//! Fleet lifecycle: `up`, `report`, `down`.
//!
//! The controller owns the only writes to the registry. Every operation
//! loads the record, derives the fleet state from it and checks the
//! requested transition before touching the provider, so lifecycle errors
//! never leave side effects behind. The one exception is a failed `up`,
//! which terminates whatever it launched before returning.

use std::path::PathBuf;
use std::time::Duration;
use swarm_core::{FleetEvent, FleetState};
use swarm_types::{FleetRecord, InstanceId, Node};

use crate::error::{Result, SwarmError};
use crate::provider::{InstanceDescription, InstanceState, LaunchSpec, Provider};
use crate::registry::FleetRegistry;
use crate::remote::SshTarget;

/// Tag applied to every launched instance.
const NAME_TAG: (&str, &str) = ("Name", "a bee!");

/// Controller settings.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Directory holding `<key_name>.pem` files.
    pub key_dir: PathBuf,
    /// Delay between instance state polls during `up`.
    pub poll_interval: Duration,
    /// How long `up` waits for every instance to run.
    pub provision_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
        Self {
            key_dir: home.join(".ssh"),
            poll_interval: Duration::from_secs(5),
            provision_timeout: Duration::from_secs(600),
        }
    }
}

/// Parameters for `up`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpRequest {
    /// Number of nodes.
    pub count: usize,
    /// Security group names.
    pub groups: Vec<String>,
    /// Availability zone.
    pub zone: String,
    /// Machine image.
    pub image_id: String,
    /// Instance size.
    pub instance_type: String,
    /// Login user on every node.
    pub owner: String,
    /// Key pair name.
    pub key_name: String,
    /// Optional VPC subnet.
    pub subnet: Option<String>,
}

/// One row of `report`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    /// Instance identifier.
    pub id: InstanceId,
    /// Provider state.
    pub state: InstanceState,
    /// Public address, if any.
    pub address: Option<String>,
}

/// What `down` achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Instances whose termination the provider confirmed.
    pub terminated: Vec<InstanceId>,
    /// Instances the provider did not confirm.
    pub unconfirmed: Vec<InstanceId>,
    /// Provider error, if the terminate call itself failed.
    pub error: Option<String>,
}

impl TeardownReport {
    /// True if every instance was confirmed terminated.
    pub fn is_complete(&self) -> bool {
        self.unconfirmed.is_empty() && self.error.is_none()
    }
}

/// Brings the fleet up, reports on it and tears it down.
pub struct FleetController<R: FleetRegistry, P: Provider> {
    registry: R,
    provider: P,
    config: ControllerConfig,
}

impl<R: FleetRegistry, P: Provider> FleetController<R, P> {
    /// Create a controller.
    pub fn new(registry: R, provider: P, config: ControllerConfig) -> Self {
        Self {
            registry,
            provider,
            config,
        }
    }

    /// The registry in use.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// The provider in use.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Current lifecycle state, as implied by the registry.
    pub async fn state(&self) -> Result<FleetState> {
        let record = self.registry.load().await?;
        Ok(FleetState::from_record(record.as_ref()))
    }

    /// Private key for `key_name`.
    pub fn key_path(&self, key_name: &str) -> PathBuf {
        self.config.key_dir.join(format!("{}.pem", key_name))
    }

    /// Login target for `node` of the fleet in `record`.
    pub fn target_for(&self, record: &FleetRecord, node: &Node) -> SshTarget {
        SshTarget::new(
            node.address.clone(),
            record.owner.clone(),
            self.key_path(&record.key_name),
        )
    }

    /// Launch the fleet and record it once every node is running.
    pub async fn up(&self, request: &UpRequest) -> Result<FleetRecord> {
        let mut state = self.state().await?.on_event(FleetEvent::ProvisionRequested {
            count: request.count,
        })?;

        if request.count == 0 {
            return Err(SwarmError::Provisioning(
                "at least one bee is required".to_string(),
            ));
        }

        let key_path = self.key_path(&request.key_name);
        if tokio::fs::metadata(&key_path).await.is_err() {
            return Err(SwarmError::Provisioning(format!(
                "no key file found at {}",
                key_path.display()
            )));
        }

        tracing::info!("Connecting to the hive.");
        let security_group_ids = if request.groups.is_empty() {
            Vec::new()
        } else {
            let ids = self
                .provider
                .resolve_security_group_ids(&request.groups, request.subnet.as_deref())
                .await
                .map_err(|e| SwarmError::Provisioning(format!("resolving security groups: {}", e)))?;
            if ids.is_empty() {
                return Err(SwarmError::Provisioning(format!(
                    "no security group named {}",
                    request.groups.join(", ")
                )));
            }
            ids
        };

        tracing::info!("Attempting to call up {} bees.", request.count);
        let spec = LaunchSpec {
            image_id: request.image_id.clone(),
            instance_type: request.instance_type.clone(),
            count: request.count,
            key_name: request.key_name.clone(),
            security_group_ids,
            zone: request.zone.clone(),
            subnet: request.subnet.clone(),
        };
        let launched = self
            .provider
            .launch_instances(&spec)
            .await
            .map_err(|e| SwarmError::Provisioning(format!("launching bees: {}", e)))?;
        let ids: Vec<InstanceId> = launched.into_iter().map(|i| i.id).collect();

        let ready = if ids.len() == request.count {
            self.wait_until_running(&ids).await
        } else {
            Err(format!(
                "requested {} bees but {} were launched",
                request.count,
                ids.len()
            ))
        };

        if let Err(reason) = ready {
            tracing::warn!("Provisioning failed ({}); recalling launched bees.", reason);
            if let Err(e) = self.provider.terminate_instances(&ids).await {
                tracing::warn!("Rollback termination failed: {}", e);
            }
            state = state.on_event(FleetEvent::ProvisionFailed)?;
            tracing::debug!("Fleet is {}", state);
            return Err(SwarmError::Provisioning(reason));
        }

        let tags = [(NAME_TAG.0.to_string(), NAME_TAG.1.to_string())];
        if let Err(e) = self.provider.tag_instances(&ids, &tags).await {
            tracing::warn!("Tagging bees failed: {}", e);
        }

        let record = FleetRecord::new(
            request.owner.clone(),
            request.key_name.clone(),
            request.zone.clone(),
            ids,
        );
        self.registry.save(&record).await?;
        state = state.on_event(FleetEvent::ProvisionSucceeded {
            nodes: record.len(),
        })?;

        tracing::info!("The swarm has assembled {} bees.", record.len());
        tracing::debug!("Fleet is {}", state);
        Ok(record)
    }

    /// Poll until every instance runs, one is gone, or the timeout passes.
    async fn wait_until_running(&self, ids: &[InstanceId]) -> std::result::Result<(), String> {
        let deadline = tokio::time::Instant::now() + self.config.provision_timeout;
        loop {
            let described = self
                .provider
                .describe_instances(ids)
                .await
                .map_err(|e| e.to_string())?;

            if let Some(gone) = described.iter().find(|i| i.state.is_gone()) {
                return Err(format!("{} is {}", gone.id, gone.state));
            }

            let running = described
                .iter()
                .filter(|i| i.state == InstanceState::Running)
                .count();
            if running == ids.len() {
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(format!(
                    "only {} of {} bees were running after {}s",
                    running,
                    ids.len(),
                    self.config.provision_timeout.as_secs()
                ));
            }

            tracing::debug!("Waiting for bees to load: {}/{} running", running, ids.len());
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Describe every node of the fleet, in fleet order.
    pub async fn report(&self) -> Result<Vec<NodeStatus>> {
        let record = self.load_record().await?;
        let described = self.provider.describe_instances(&record.instance_ids).await?;

        Ok(record
            .instance_ids
            .iter()
            .map(|id| match find(&described, id) {
                Some(d) => NodeStatus {
                    id: id.clone(),
                    state: d.state.clone(),
                    address: d.public_address.clone(),
                },
                None => NodeStatus {
                    id: id.clone(),
                    state: InstanceState::Other("unknown".to_string()),
                    address: None,
                },
            })
            .collect())
    }

    /// Terminate every node and clear the registry.
    ///
    /// The registry is cleared even when the provider does not confirm every
    /// termination; the report lists what was left unconfirmed.
    pub async fn down(&self) -> Result<TeardownReport> {
        let record = self.registry.load().await?;
        let mut state = FleetState::from_record(record.as_ref())
            .on_event(FleetEvent::TerminateRequested)?;
        let record = record.ok_or(SwarmError::NotFound)?;

        tracing::info!("Calling off the swarm.");
        let report = match self.provider.terminate_instances(&record.instance_ids).await {
            Ok(confirmed) => TeardownReport {
                unconfirmed: record
                    .instance_ids
                    .iter()
                    .filter(|id| !confirmed.contains(id))
                    .cloned()
                    .collect(),
                terminated: confirmed,
                error: None,
            },
            Err(e) => {
                tracing::warn!("Terminate request failed: {}", e);
                TeardownReport {
                    terminated: Vec::new(),
                    unconfirmed: record.instance_ids.clone(),
                    error: Some(e.to_string()),
                }
            }
        };

        self.registry.clear().await?;
        state = state.on_event(FleetEvent::TerminationFinished)?;
        tracing::info!("Stood down {} bees.", report.terminated.len());
        tracing::debug!("Fleet is {}", state);
        Ok(report)
    }

    /// Resolve the fleet into addressable nodes, in fleet order.
    ///
    /// Nodes without a public address get an empty one.
    pub async fn nodes(&self) -> Result<(FleetRecord, Vec<Node>)> {
        let record = self.load_record().await?;
        let described = self.provider.describe_instances(&record.instance_ids).await?;

        let nodes = record
            .instance_ids
            .iter()
            .enumerate()
            .map(|(index, id)| {
                let address = find(&described, id)
                    .and_then(|d| d.public_address.clone())
                    .unwrap_or_default();
                Node::new(id.clone(), address, index)
            })
            .collect();
        Ok((record, nodes))
    }

    async fn load_record(&self) -> Result<FleetRecord> {
        match self.registry.load().await? {
            Some(record) if !record.is_empty() => Ok(record),
            _ => Err(SwarmError::NotFound),
        }
    }
}

fn find<'a>(described: &'a [InstanceDescription], id: &InstanceId) -> Option<&'a InstanceDescription> {
    described.iter().find(|d| &d.id == id)
}
