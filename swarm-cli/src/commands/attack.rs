//! Attack a URL with the swarm.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use swarm_client::{
    AttackCoordinator, AttackOptions, HttpWarmUp, SshConnector, Strategy,
};
use swarm_types::{parse_headers, Payload};

use crate::commands::recorded_fleet;
use crate::config::Config;
use crate::output;

/// Options for `bees attack`.
#[derive(Args, Debug)]
pub struct AttackArgs {
    /// URL to attack
    pub url: String,

    /// Total number of requests across all bees
    #[arg(long, short, default_value_t = 1000)]
    pub number: u64,

    /// Total number of concurrent requests across all bees
    #[arg(long, short, default_value_t = 100)]
    pub concurrent: u64,

    /// Headers to send, as "Name: value;Name2: value2"
    #[arg(long = "headers", short = 'H')]
    pub headers: Option<String>,

    /// File to POST as the request body
    #[arg(long = "post-file", short = 'p')]
    pub post_file: Option<PathBuf>,

    /// MIME type of the POST body
    #[arg(long = "mime-type", short = 'm', default_value = "text/plain")]
    pub mime_type: String,

    /// Write the percentile table to this CSV file
    #[arg(long, short = 'e')]
    pub csv: Option<PathBuf>,

    /// Replay the browser suite in this directory instead of benchmarking
    #[arg(long, conflicts_with_all = ["post_file", "csv"])]
    pub browser_suite: Option<PathBuf>,

    /// Where browser-suite reports are collected
    #[arg(long, requires = "browser_suite")]
    pub results_dir: Option<PathBuf>,
}

impl AttackArgs {
    /// Request options carried to every bee.
    pub fn options(&self) -> Result<AttackOptions> {
        let headers = match &self.headers {
            Some(spec) => parse_headers(spec).context("Invalid --headers")?,
            None => Vec::new(),
        };
        let payload = self.post_file.as_ref().map(|path| Payload {
            path: path.clone(),
            mime_type: self.mime_type.clone(),
        });
        Ok(AttackOptions {
            headers,
            payload,
            ..AttackOptions::default()
        })
    }

    /// The strategy every bee runs.
    pub fn strategy(&self, config: &Config) -> Strategy {
        match &self.browser_suite {
            Some(suite) => {
                let results = self
                    .results_dir
                    .clone()
                    .or_else(|| config.attack.browser_results_dir.clone())
                    .unwrap_or_else(|| suite.clone());
                Strategy::browser_suite(suite.clone(), results)
            }
            None => Strategy::benchmark(),
        }
    }
}

/// Run the attack command.
pub async fn run(config: &Config, args: AttackArgs) -> Result<()> {
    let options = args.options()?;
    if let Some(csv) = &args.csv {
        output::check_writable(csv)?;
    }
    if let Some(payload) = &options.payload {
        anyhow::ensure!(
            payload.path.is_file(),
            "POST file {} does not exist",
            payload.path.display()
        );
    }

    let strategy = args.strategy(config);
    if let Strategy::BrowserSuite(browser) = &strategy {
        tokio::fs::create_dir_all(&browser.results_dir)
            .await
            .with_context(|| format!("Failed to create {}", browser.results_dir.display()))?;
    }

    let coordinator = AttackCoordinator::new(
        recorded_fleet(config).await?,
        Arc::new(SshConnector::new(config.ssh.connect_timeout_secs)),
        strategy.clone(),
        Box::new(HttpWarmUp::new()),
        config.coordinator_config(),
    );

    let outcome = coordinator
        .attack(&args.url, args.number, args.concurrent, options)
        .await?;

    for line in output::failed_nodes(&outcome) {
        tracing::warn!("{}", line);
    }

    match &strategy {
        Strategy::BrowserSuite(browser) => {
            let tally = output::tally_browser_results(&browser.results_dir)?;
            println!("{} tests passed", tally.passed);
            println!("{} tests failed", tally.failed);
        }
        Strategy::Benchmark(_) => {
            print!("{}", output::render_summary(&outcome.report));
            if let Some(csv) = &args.csv {
                if outcome.report.summary().is_some() {
                    output::write_percentile_csv(csv, &outcome)?;
                    println!("Percentile table written to {}", csv.display());
                }
            }
        }
    }

    println!("Offensive complete.");
    println!("The swarm is awaiting new orders.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use swarm_types::Header;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: AttackArgs,
    }

    fn parse(argv: &[&str]) -> AttackArgs {
        TestCli::try_parse_from(std::iter::once("bees").chain(argv.iter().copied()))
            .unwrap()
            .args
    }

    #[test]
    fn defaults_match_stock_attack() {
        let args = parse(&["http://target.test/"]);
        assert_eq!(args.number, 1000);
        assert_eq!(args.concurrent, 100);
        assert_eq!(args.mime_type, "text/plain");
        assert!(matches!(args.strategy(&Config::default()), Strategy::Benchmark(_)));
    }

    #[test]
    fn headers_and_payload_become_options() {
        let args = parse(&[
            "http://target.test/",
            "-H",
            "Host: example.com;X-Bee: 1",
            "-p",
            "/tmp/body.json",
            "-m",
            "application/json",
        ]);
        let options = args.options().unwrap();
        assert_eq!(
            options.headers,
            vec![Header::new("Host", "example.com"), Header::new("X-Bee", "1")]
        );
        let payload = options.payload.unwrap();
        assert_eq!(payload.path, PathBuf::from("/tmp/body.json"));
        assert_eq!(payload.mime_type, "application/json");
    }

    #[test]
    fn malformed_headers_rejected() {
        let args = parse(&["http://target.test/", "-H", "no separator"]);
        assert!(args.options().is_err());
    }

    #[test]
    fn browser_suite_results_default_to_suite_dir() {
        let args = parse(&["http://target.test/", "--browser-suite", "/suites/login"]);
        match args.strategy(&Config::default()) {
            Strategy::BrowserSuite(browser) => {
                assert_eq!(browser.results_dir, PathBuf::from("/suites/login"));
            }
            other => panic!("unexpected strategy {:?}", other),
        }
    }

    #[test]
    fn browser_suite_conflicts_with_csv() {
        let result = TestCli::try_parse_from([
            "bees",
            "http://target.test/",
            "--browser-suite",
            "/suites",
            "--csv",
            "out.csv",
        ]);
        assert!(result.is_err());
    }
}
