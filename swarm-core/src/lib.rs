//! # swarm-core
//!
//! Pure logic for beeswarm (no I/O, instant tests).
//!
//! This crate implements the decisions behind a fleet attack without touching
//! the network, the provider, or the disk:
//! - [`plan`] validates attack sizes and splits them across nodes
//! - [`state`] tracks the fleet lifecycle as a state machine
//! - [`parse`] reads the benchmark tool's text summary and latency CSV
//! - [`aggregate`] merges node results into one report
//!
//! The actual I/O (provider calls, remote sessions, registry files) is
//! performed by `swarm-client`, which feeds its observations into these
//! functions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod parse;
pub mod plan;
pub mod state;

pub use aggregate::{Aggregator, ResampleConfig, DEFAULT_SAMPLE_BUDGET, DEFAULT_TABLE_SIZE};
pub use parse::{parse_benchmark_summary, parse_latency_csv, BenchmarkSummary, ParseError};
pub use plan::{split_evenly, AttackOptions, AttackPlan, ValidationError};
pub use state::{FleetEvent, FleetState, TransitionError};
