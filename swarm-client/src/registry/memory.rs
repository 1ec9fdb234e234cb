//! In-memory registry for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use swarm_types::FleetRecord;

use super::{FleetRegistry, RegistryError};

/// Registry held in memory. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    inner: Arc<Mutex<Option<FleetRecord>>>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that already holds `record`.
    pub fn with_record(record: FleetRecord) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(record))),
        }
    }

    /// Current record, without going through the async API.
    pub fn snapshot(&self) -> Option<FleetRecord> {
        self.inner.lock().unwrap().clone()
    }
}

#[async_trait]
impl FleetRegistry for MemoryRegistry {
    async fn load(&self) -> Result<Option<FleetRecord>, RegistryError> {
        Ok(self.snapshot())
    }

    async fn save(&self, record: &FleetRecord) -> Result<(), RegistryError> {
        *self.inner.lock().unwrap() = Some(record.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), RegistryError> {
        *self.inner.lock().unwrap() = None;
        Ok(())
    }
}
