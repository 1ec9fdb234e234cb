//! CLI command implementations.

pub mod attack;
pub mod down;
pub mod report;
pub mod up;

use anyhow::{Context, Result};
use swarm_client::{AwsCliProvider, FileRegistry, FleetController, FleetRegistry};
use swarm_types::region_from_zone;

use crate::config::Config;

/// Controller for the recorded fleet, talking to the fleet's region.
///
/// With no recorded fleet the configured zone picks the region.
pub async fn recorded_fleet(config: &Config) -> Result<FleetController<FileRegistry, AwsCliProvider>> {
    let registry = FileRegistry::new(&config.fleet.state_file);
    let record = registry
        .load()
        .await
        .context("Failed to read fleet state")?;
    let region = match &record {
        Some(record) => record.region().to_string(),
        None => region_from_zone(&config.fleet.zone).to_string(),
    };

    Ok(FleetController::new(
        registry,
        AwsCliProvider::new(region),
        config.controller_config(),
    ))
}
