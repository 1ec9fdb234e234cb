//! Error types for fleet and attack operations.

use swarm_core::{TransitionError, ValidationError};
use thiserror::Error;

use crate::provider::ProviderError;
use crate::registry::RegistryError;
use crate::warmup::WarmUpError;

/// Errors surfaced to the caller of a fleet or attack operation.
///
/// Per-node failures during an attack are not errors: they come back as
/// [`swarm_types::NodeResult`] variants inside the report.
#[derive(Debug, Error)]
pub enum SwarmError {
    /// `up` was called while a fleet exists.
    #[error("bees are already assembled and awaiting orders")]
    AlreadyActive,

    /// `report`, `down` or `attack` was called with no fleet.
    #[error("no bees have been mobilized")]
    NotFound,

    /// The fleet could not be brought up.
    #[error("provisioning failed: {0}")]
    Provisioning(String),

    /// Attack totals cannot be split across the fleet.
    #[error("invalid attack: {0}")]
    Validation(#[from] ValidationError),

    /// The pre-attack request to the target failed.
    #[error("warm-up request failed: {0}")]
    WarmUp(#[from] WarmUpError),

    /// Fleet state could not be read or written.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The provider rejected a call.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Any other lifecycle transition the fleet state does not allow.
    #[error("fleet state error: {0}")]
    State(TransitionError),
}

impl From<TransitionError> for SwarmError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::AlreadyActive => SwarmError::AlreadyActive,
            TransitionError::NotFound => SwarmError::NotFound,
            other => SwarmError::State(other),
        }
    }
}

/// Result type alias for fleet and attack operations.
pub type Result<T> = std::result::Result<T, SwarmError>;
