//! # bees
//!
//! Raise a disposable swarm of cloud instances and point them at a URL.
//!
//! ## Commands
//!
//! - `up`: Launch the swarm
//! - `report`: Show the state of every bee
//! - `attack`: Load-test a URL with the swarm
//! - `down`: Terminate the swarm
//!
//! ## Example
//!
//! ```bash
//! # Launch four bees
//! bees up -s 4 -g public -k frontend
//!
//! # 10,000 requests, 250 at a time, spread across the swarm
//! bees attack http://www.ournewwebbyhotness.com/ -n 10000 -c 250
//!
//! # Same, saving the percentile table
//! bees attack http://www.ournewwebbyhotness.com/ -n 10000 -c 250 --csv results.csv
//!
//! # Terminate
//! bees down
//! ```

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod output;

use commands::{attack, down, report, up};
use config::Config;

/// Raise a swarm of load-testing bees.
#[derive(Parser, Debug)]
#[command(name = "bees")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/bees.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// File recording the active fleet (overrides the config file)
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(long, short, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch the swarm
    Up(up::UpArgs),

    /// Report the status of the swarm
    Report,

    /// Attack a URL with the swarm
    Attack(attack::AttackArgs),

    /// Call off the swarm
    Down,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(state_file) = cli.state_file {
        config.fleet.state_file = state_file;
    }

    match cli.command {
        Commands::Up(args) => up::run(&config, args).await?,
        Commands::Report => report::run(&config).await?,
        Commands::Attack(args) => attack::run(&config, args).await?,
        Commands::Down => down::run(&config).await?,
    }

    Ok(())
}

/// Install the log subscriber: `RUST_LOG` wins, else the verbosity flag.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
