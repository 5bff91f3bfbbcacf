//! rebalancer.toml configuration parser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::parse_interval;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RebalancerConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Number of resources reconciled in parallel.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Deadline for a whole reconcile pass, e.g. "30s".
    #[serde(default = "default_pass_timeout")]
    pub pass_timeout: String,
    /// First retry delay after a failed pass.
    #[serde(default = "default_backoff_base")]
    pub backoff_base: String,
    /// Cap for the doubling retry delay.
    #[serde(default = "default_backoff_max")]
    pub backoff_max: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            pass_timeout: default_pass_timeout(),
            backoff_base: default_backoff_base(),
            backoff_max: default_backoff_max(),
        }
    }
}

impl ControllerConfig {
    pub fn pass_timeout(&self) -> anyhow::Result<Duration> {
        Ok(parse_interval(&self.pass_timeout)?)
    }

    pub fn backoff_base(&self) -> anyhow::Result<Duration> {
        Ok(parse_interval(&self.backoff_base)?)
    }

    pub fn backoff_max(&self) -> anyhow::Result<Duration> {
        Ok(parse_interval(&self.backoff_max)?)
    }
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/rebalancer")
}

fn default_workers() -> usize {
    4
}

fn default_pass_timeout() -> String {
    "30s".to_string()
}

fn default_backoff_base() -> String {
    "1s".to_string()
}

fn default_backoff_max() -> String {
    "60s".to_string()
}

impl RebalancerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: RebalancerConfig = toml::from_str(content)?;
        if config.controller.workers == 0 {
            anyhow::bail!("controller.workers must be at least 1");
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RebalancerConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.controller.workers, 4);
        assert_eq!(config.controller.pass_timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(config.controller.backoff_max().unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn test_parse_partial() {
        let toml_str = r#"
[server]
port = 9443

[controller]
workers = 8
backoff_base = "500ms"
"#;
        let config = RebalancerConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9443);
        assert_eq!(config.controller.workers, 8);
        assert_eq!(
            config.controller.backoff_base().unwrap(),
            Duration::from_millis(500)
        );
        assert_eq!(config.store.data_dir, PathBuf::from("/var/lib/rebalancer"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let toml_str = "[controller]\nworkers = 0\n";
        assert!(RebalancerConfig::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn test_roundtrip_pretty() {
        let toml_str = RebalancerConfig::default().to_toml_string().unwrap();
        assert!(toml_str.contains("pass_timeout"));
    }
}
