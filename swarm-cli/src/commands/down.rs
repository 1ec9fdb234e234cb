//! Call off the swarm.

use anyhow::Result;

use crate::commands::recorded_fleet;
use crate::config::Config;

/// Run the down command.
pub async fn run(config: &Config) -> Result<()> {
    let controller = recorded_fleet(config).await?;
    let report = controller.down().await?;

    println!("Stood down {} bees.", report.terminated.len());
    if let Some(error) = &report.error {
        println!("The provider reported an error: {}", error);
    }
    if !report.unconfirmed.is_empty() {
        println!(
            "Termination was not confirmed for {} bees; check them manually:",
            report.unconfirmed.len()
        );
        for id in &report.unconfirmed {
            println!("  {}", id);
        }
    }
    Ok(())
}
