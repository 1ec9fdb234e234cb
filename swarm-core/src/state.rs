//! Fleet lifecycle state machine.
//!
//! This module provides a pure, side-effect-free state machine for the fleet
//! lifecycle. The controller in swarm-client feeds it events as provider
//! calls succeed or fail and refuses any operation the current state does
//! not allow.
//!
//! ```text
//! Absent ──up──► Provisioning ──all running──► Active
//!   ▲                 │                           │
//!   │           provision failed                down
//!   │                 ▼                           ▼
//!   └────────────── Absent ◄──terminated── Terminating
//! ```
//!
//! Attacks read the fleet but never move it between states.

use std::fmt;
use swarm_types::FleetRecord;
use thiserror::Error;

/// Where the fleet is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetState {
    /// No fleet exists.
    Absent,
    /// Instances have been requested and are not all running yet.
    Provisioning {
        /// Number of instances requested.
        requested: usize,
    },
    /// Every node is running and the fleet is recorded.
    Active {
        /// Number of nodes in the fleet.
        nodes: usize,
    },
    /// Termination has been requested.
    Terminating {
        /// Number of nodes being terminated.
        nodes: usize,
    },
}

/// Something that happened to the fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetEvent {
    /// `up` was called.
    ProvisionRequested {
        /// Number of instances requested.
        count: usize,
    },
    /// Every requested instance reached the running state.
    ProvisionSucceeded {
        /// Number of running nodes.
        nodes: usize,
    },
    /// Provisioning was abandoned (launch rejected or timed out).
    ProvisionFailed,
    /// `down` was called.
    TerminateRequested,
    /// The provider was asked to terminate every node.
    TerminationFinished,
}

/// An event the current state does not accept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// A fleet already exists.
    #[error("a fleet is already active")]
    AlreadyActive,

    /// No fleet exists.
    #[error("no fleet is active")]
    NotFound,

    /// Any other combination.
    #[error("cannot apply {event:?} while fleet is {state}")]
    Invalid {
        /// State at the time of the event.
        state: FleetState,
        /// Rejected event.
        event: FleetEvent,
    },
}

impl FleetState {
    /// The state implied by the registry contents.
    pub fn from_record(record: Option<&FleetRecord>) -> Self {
        match record {
            Some(record) if !record.is_empty() => Self::Active {
                nodes: record.len(),
            },
            _ => Self::Absent,
        }
    }

    /// True if no fleet exists.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Apply an event and return the next state.
    pub fn on_event(self, event: FleetEvent) -> Result<Self, TransitionError> {
        match (self, event) {
            (Self::Absent, FleetEvent::ProvisionRequested { count }) => {
                Ok(Self::Provisioning { requested: count })
            }
            (Self::Provisioning { .. }, FleetEvent::ProvisionSucceeded { nodes }) => {
                Ok(Self::Active { nodes })
            }
            (Self::Provisioning { .. }, FleetEvent::ProvisionFailed) => Ok(Self::Absent),
            (Self::Active { nodes }, FleetEvent::TerminateRequested) => {
                Ok(Self::Terminating { nodes })
            }
            (Self::Terminating { .. }, FleetEvent::TerminationFinished) => Ok(Self::Absent),

            (Self::Absent, FleetEvent::TerminateRequested) => Err(TransitionError::NotFound),
            (_, FleetEvent::ProvisionRequested { .. }) => Err(TransitionError::AlreadyActive),

            (state, event) => Err(TransitionError::Invalid { state, event }),
        }
    }
}

impl fmt::Display for FleetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Provisioning { requested } => write!(f, "provisioning {} bees", requested),
            Self::Active { nodes } => write!(f, "active with {} bees", nodes),
            Self::Terminating { nodes } => write!(f, "terminating {} bees", nodes),
        }
    }
}
