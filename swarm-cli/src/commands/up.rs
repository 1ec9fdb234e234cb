//! Launch the swarm.

use anyhow::{Context, Result};
use clap::Args;
use swarm_client::{AwsCliProvider, FileRegistry, FleetController, UpRequest};
use swarm_types::region_from_zone;

use crate::config::Config;

/// Options for `bees up`. Unset options come from the config file.
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Number of bees to start
    #[arg(long, short)]
    pub servers: Option<usize>,

    /// Security group the bees will join
    #[arg(long, short)]
    pub group: Option<String>,

    /// Availability zone to start the bees in
    #[arg(long, short)]
    pub zone: Option<String>,

    /// Machine image for the bees
    #[arg(long, short)]
    pub instance: Option<String>,

    /// Instance type for the bees
    #[arg(long = "type", short = 't')]
    pub instance_type: Option<String>,

    /// Login user on the bees
    #[arg(long, short)]
    pub login: Option<String>,

    /// Key pair name; the private key is read from `<key_dir>/<key>.pem`
    #[arg(long, short)]
    pub key: Option<String>,

    /// VPC subnet to launch into
    #[arg(long)]
    pub subnet: Option<String>,
}

impl UpArgs {
    /// Merge the flags over the configured defaults.
    pub fn into_request(self, config: &Config) -> Result<UpRequest> {
        let fleet = &config.fleet;
        let key_name = self
            .key
            .or_else(|| fleet.key_name.clone())
            .context("A key pair name is required (--key or [fleet] key_name)")?;

        Ok(UpRequest {
            count: self.servers.unwrap_or(fleet.count),
            groups: vec![self.group.unwrap_or_else(|| fleet.group.clone())],
            zone: self.zone.unwrap_or_else(|| fleet.zone.clone()),
            image_id: self.instance.unwrap_or_else(|| fleet.image_id.clone()),
            instance_type: self
                .instance_type
                .unwrap_or_else(|| fleet.instance_type.clone()),
            owner: self.login.unwrap_or_else(|| fleet.login.clone()),
            key_name,
            subnet: self.subnet.or_else(|| fleet.subnet.clone()),
        })
    }
}

/// Run the up command.
pub async fn run(config: &Config, args: UpArgs) -> Result<()> {
    let request = args.into_request(config)?;
    let controller = FleetController::new(
        FileRegistry::new(&config.fleet.state_file),
        AwsCliProvider::new(region_from_zone(&request.zone)),
        config.controller_config(),
    );

    let record = controller.up(&request).await?;
    println!("The swarm has assembled {} bees.", record.len());
    for id in &record.instance_ids {
        println!("  {}", id);
    }
    Ok(())
}
