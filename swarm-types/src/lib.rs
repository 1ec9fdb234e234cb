//! # swarm-types
//!
//! Data model for beeswarm, the disposable load-testing fleet.
//!
//! This crate provides the types shared by every other beeswarm crate:
//! - [`FleetRecord`], [`InstanceId`], [`Node`] - Fleet identity and membership
//! - [`AttackRequest`], [`Header`], [`Payload`], [`StrategyKind`] - One node's slice of an attack
//! - [`NodeResult`], [`NodeMetrics`], [`LatencySample`] - What a node reports back
//! - [`AggregateReport`], [`AttackSummary`], [`Verdict`] - The merged fleet-wide view

#![warn(missing_docs)]
#![warn(clippy::all)]

mod attack;
mod error;
mod fleet;
mod report;
mod result;

pub use attack::{parse_headers, AttackRequest, Header, Payload, StrategyKind};
pub use error::{AggregationError, HeaderError};
pub use fleet::{region_from_zone, FleetRecord, InstanceId, Node};
pub use report::{AggregateReport, AttackSummary, Percentile, Verdict};
pub use result::{LatencySample, NodeMetrics, NodeResult};
