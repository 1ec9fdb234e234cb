//! Report the status of the swarm.

use anyhow::Result;

use crate::commands::recorded_fleet;
use crate::config::Config;

/// Run the report command.
pub async fn run(config: &Config) -> Result<()> {
    let controller = recorded_fleet(config).await?;
    for status in controller.report().await? {
        println!(
            "Bee {}: {} @ {}",
            status.id,
            status.state,
            status.address.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
