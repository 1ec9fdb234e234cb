//! # swarm-client
//!
//! Fleet controller and attack coordinator for beeswarm.
//!
//! This is the library the `bees` CLI drives. It owns all I/O:
//!
//! - **Registry**: where the single active fleet is recorded ([`FileRegistry`], [`MemoryRegistry`])
//! - **Provider**: the cloud instance API ([`AwsCliProvider`], [`MockProvider`])
//! - **Remote execution**: sessions on fleet nodes ([`SshConnector`], [`MockConnector`])
//! - **Strategies**: what a node does during an attack ([`Strategy`])
//! - **Controller / Coordinator**: `up` / `report` / `down` and `attack`
//!
//! Decisions (validation, splitting, lifecycle transitions, aggregation)
//! come from `swarm-core`; this crate performs the side effects.
//!
//! ```text
//! CLI → FleetController ──► Provider
//!          │    ▲
//!          ▼    │
//!       FleetRegistry
//!          ▲
//! CLI → AttackCoordinator ──► Strategy × N ──► Connector/Session
//!                 │
//!            swarm-core (plan, aggregate)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use swarm_client::*;
//!
//! let fleet = FleetController::new(FileRegistry::new(state_path), provider, ControllerConfig::default());
//! let coordinator = AttackCoordinator::new(
//!     fleet,
//!     Arc::new(SshConnector::default()),
//!     Strategy::benchmark(),
//!     Box::new(HttpWarmUp::new()),
//!     CoordinatorConfig::default(),
//! );
//! let outcome = coordinator.attack("http://target/", 1000, 50, AttackOptions::default()).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod controller;
pub mod coordinator;
pub mod error;
pub mod provider;
pub mod registry;
pub mod remote;
pub mod strategy;
pub mod warmup;

pub use controller::{ControllerConfig, FleetController, NodeStatus, TeardownReport, UpRequest};
pub use coordinator::{AttackCoordinator, AttackOutcome, CoordinatorConfig, NodeOutcome};
pub use error::SwarmError;
pub use provider::{
    AwsCliProvider, InstanceDescription, InstanceState, LaunchSpec, MockProvider, Provider,
    ProviderError,
};
pub use registry::{FileRegistry, FleetRegistry, MemoryRegistry, RegistryError};
pub use remote::{
    Connector, ExecOutput, MockConnector, RemoteError, Session, SshConnector, SshTarget,
};
pub use strategy::{BenchmarkStrategy, BrowserSuiteStrategy, Strategy};
pub use swarm_core::{AttackOptions, ResampleConfig};
pub use warmup::{HttpWarmUp, MockWarmUp, WarmUp, WarmUpError};
