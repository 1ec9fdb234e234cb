//! Where the single active fleet is recorded.
//!
//! A registry holds at most one [`FleetRecord`]. Readers see either no
//! record or a complete one; a save replaces the previous record as a unit.

mod file;
mod memory;

pub use file::FileRegistry;
pub use memory::MemoryRegistry;

use async_trait::async_trait;
use std::path::PathBuf;
use swarm_types::FleetRecord;
use thiserror::Error;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The backing file could not be read or written.
    #[error("fleet state {path}: {source}")]
    Io {
        /// Path of the state file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The backing file exists but does not hold a fleet record.
    #[error("fleet state {path} is corrupt: {source}")]
    Corrupt {
        /// Path of the state file.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },
}

/// Durable record of the active fleet.
#[async_trait]
pub trait FleetRegistry: Send + Sync {
    /// Read the record, if a fleet exists.
    async fn load(&self) -> Result<Option<FleetRecord>, RegistryError>;

    /// Replace the record atomically.
    async fn save(&self, record: &FleetRecord) -> Result<(), RegistryError>;

    /// Remove the record. Clearing an empty registry is not an error.
    async fn clear(&self) -> Result<(), RegistryError>;
}
