//! Configuration loading for bees.
//!
//! Configuration is loaded from an optional TOML file (default:
//! `<config dir>/bees.toml`). Every section and field may be left out.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use swarm_client::{ControllerConfig, CoordinatorConfig, ResampleConfig};

/// Root configuration for bees.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Defaults for `up` and where the fleet is recorded.
    #[serde(default)]
    pub fleet: FleetConfig,
    /// Provisioning limits.
    #[serde(default)]
    pub provision: ProvisionConfig,
    /// Attack settings.
    #[serde(default)]
    pub attack: AttackConfig,
    /// Remote login settings.
    #[serde(default)]
    pub ssh: SshConfig,
}

/// Fleet defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    /// Number of bees to launch (default: 5).
    #[serde(default = "default_count")]
    pub count: usize,
    /// Security group (default: "default").
    #[serde(default = "default_group")]
    pub group: String,
    /// Availability zone (default: us-east-1d).
    #[serde(default = "default_zone")]
    pub zone: String,
    /// Machine image.
    #[serde(default = "default_image_id")]
    pub image_id: String,
    /// Instance size.
    #[serde(default = "default_instance_type")]
    pub instance_type: String,
    /// Login user on every bee.
    #[serde(default = "default_login")]
    pub login: String,
    /// Key pair name.
    pub key_name: Option<String>,
    /// VPC subnet.
    pub subnet: Option<String>,
    /// File recording the active fleet (default: ~/.bees).
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

/// Provisioning limits.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionConfig {
    /// Seconds between instance state polls (default: 5).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Seconds to wait for every bee to run (default: 600).
    #[serde(default = "default_provision_timeout_secs")]
    pub timeout_secs: u64,
}

/// Attack settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AttackConfig {
    /// Seconds a single bee may take (default: 3600).
    #[serde(default = "default_node_timeout_secs")]
    pub node_timeout_secs: u64,
    /// Latency samples drawn across all bees (default: 10000).
    #[serde(default = "default_sample_budget")]
    pub sample_budget: usize,
    /// Entries in the percentile table (default: 100).
    #[serde(default = "default_table_size")]
    pub table_size: usize,
    /// Where browser-suite reports are collected (default: the suite directory).
    pub browser_results_dir: Option<PathBuf>,
}

/// Remote login settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SshConfig {
    /// Directory holding `<key_name>.pem` (default: ~/.ssh).
    #[serde(default = "default_key_dir")]
    pub key_dir: PathBuf,
    /// ssh connect timeout in seconds (default: 30).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

// Default value functions
fn default_count() -> usize {
    5
}

fn default_group() -> String {
    "default".to_string()
}

fn default_zone() -> String {
    "us-east-1d".to_string()
}

fn default_image_id() -> String {
    "ami-ff17fb96".to_string()
}

fn default_instance_type() -> String {
    "t1.micro".to_string()
}

fn default_login() -> String {
    "newsapps".to_string()
}

fn home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_default()
}

fn default_state_file() -> PathBuf {
    home_dir().join(".bees")
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_provision_timeout_secs() -> u64 {
    600 // 10 minutes
}

fn default_node_timeout_secs() -> u64 {
    3600 // 1 hour
}

fn default_sample_budget() -> usize {
    10_000
}

fn default_table_size() -> usize {
    100
}

fn default_key_dir() -> PathBuf {
    home_dir().join(".ssh")
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            group: default_group(),
            zone: default_zone(),
            image_id: default_image_id(),
            instance_type: default_instance_type(),
            login: default_login(),
            key_name: None,
            subnet: None,
            state_file: default_state_file(),
        }
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_provision_timeout_secs(),
        }
    }
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            node_timeout_secs: default_node_timeout_secs(),
            sample_budget: default_sample_budget(),
            table_size: default_table_size(),
            browser_results_dir: None,
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            key_dir: default_key_dir(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `explicit` if given, else the default file if it exists, else
    /// built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Settings for the fleet controller.
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            key_dir: self.ssh.key_dir.clone(),
            poll_interval: Duration::from_secs(self.provision.poll_interval_secs),
            provision_timeout: Duration::from_secs(self.provision.timeout_secs),
        }
    }

    /// Settings for the attack coordinator.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            node_timeout: Duration::from_secs(self.attack.node_timeout_secs),
            resample: ResampleConfig {
                sample_budget: self.attack.sample_budget,
                table_size: self.attack.table_size,
            },
        }
    }
}

/// Default location of the configuration file.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "beeswarm", "bees")
        .map(|dirs| dirs.config_dir().join("bees.toml"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_stock_values() {
        let config = Config::default();
        assert_eq!(config.fleet.count, 5);
        assert_eq!(config.fleet.zone, "us-east-1d");
        assert_eq!(config.provision.poll_interval_secs, 5);
        assert_eq!(config.provision.timeout_secs, 600);
        assert_eq!(config.attack.sample_budget, 10_000);
        assert_eq!(config.attack.table_size, 100);
        assert_eq!(config.ssh.connect_timeout_secs, 30);
        assert!(config.fleet.state_file.ends_with(".bees"));
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[fleet]
count = 12
zone = "eu-west-1b"
key_name = "frontend"
state_file = "/var/lib/bees/fleet.json"

[provision]
timeout_secs = 120

[attack]
node_timeout_secs = 900
browser_results_dir = "/tmp/results"

[ssh]
key_dir = "/etc/bees/keys"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.fleet.count, 12);
        assert_eq!(config.fleet.zone, "eu-west-1b");
        assert_eq!(config.fleet.key_name.as_deref(), Some("frontend"));
        assert_eq!(config.fleet.state_file, PathBuf::from("/var/lib/bees/fleet.json"));
        assert_eq!(config.provision.timeout_secs, 120);
        assert_eq!(config.attack.node_timeout_secs, 900);
        assert_eq!(
            config.attack.browser_results_dir,
            Some(PathBuf::from("/tmp/results"))
        );
        assert_eq!(config.ssh.key_dir, PathBuf::from("/etc/bees/keys"));
    }

    #[test]
    fn config_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[fleet]\ncount = 2\n").unwrap();
        assert_eq!(config.fleet.count, 2);
        assert_eq!(config.fleet.group, "default");
        assert_eq!(config.provision.poll_interval_secs, 5);
        assert_eq!(config.attack.table_size, 100);
    }

    #[test]
    fn client_configs_use_file_values() {
        let toml = r#"
[provision]
poll_interval_secs = 2
[attack]
node_timeout_secs = 60
sample_budget = 500
table_size = 10
[ssh]
key_dir = "/keys"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        let controller = config.controller_config();
        assert_eq!(controller.poll_interval, Duration::from_secs(2));
        assert_eq!(controller.key_dir, PathBuf::from("/keys"));

        let coordinator = config.coordinator_config();
        assert_eq!(coordinator.node_timeout, Duration::from_secs(60));
        assert_eq!(coordinator.resample.sample_budget, 500);
        assert_eq!(coordinator.resample.table_size, 10);
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bees.toml");
        std::fs::write(&path, "[fleet]\nlogin = \"ubuntu\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.fleet.login, "ubuntu");
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let result = Config::load(Some(Path::new("/nonexistent/bees.toml")));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bees.toml");
        std::fs::write(&path, "[fleet\ncount = ").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
