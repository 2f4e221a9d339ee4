//! Configuration for tcready

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::{Error, Result};

/// Default config file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "tcready.toml";

/// Environment variable overriding the config file path
pub const CONFIG_PATH_ENV: &str = "TCREADY_CONFIG";

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Readiness checker settings
    #[serde(default)]
    pub checker: CheckerConfig,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            checker: CheckerConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// Readiness checker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Interval between two evaluations of the predicate chain
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Overall deadline for the cluster to converge
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Bound on a single kubernetes read
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,

    /// Bound on a single status probe request
    #[serde(default = "default_http_timeout")]
    pub http_timeout_ms: u64,

    /// Node label partitioning failure domains
    #[serde(default = "default_failure_domain_key")]
    pub failure_domain_key: String,

    /// Toleration every pump pod must carry
    #[serde(default = "default_toleration_key")]
    pub required_toleration_key: String,

    /// Pump status port
    #[serde(default = "default_pump_status_port")]
    pub pump_status_port: u16,

    /// TiDB status port
    #[serde(default = "default_tidb_status_port")]
    pub tidb_status_port: u16,
}

fn default_poll_interval() -> u64 {
    5_000
}
fn default_timeout() -> u64 {
    600_000
}
fn default_fetch_timeout() -> u64 {
    10_000
}
fn default_http_timeout() -> u64 {
    5_000
}
fn default_failure_domain_key() -> String {
    "rack".to_string()
}
fn default_toleration_key() -> String {
    "node-role".to_string()
}
fn default_pump_status_port() -> u16 {
    8250
}
fn default_tidb_status_port() -> u16 {
    10080
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            timeout_ms: default_timeout(),
            fetch_timeout_ms: default_fetch_timeout(),
            http_timeout_ms: default_http_timeout(),
            failure_domain_key: default_failure_domain_key(),
            required_toleration_key: default_toleration_key(),
            pump_status_port: default_pump_status_port(),
            tidb_status_port: default_tidb_status_port(),
        }
    }
}

impl CheckerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Reject settings the poller cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig("poll_interval_ms must be > 0".into()));
        }
        if self.fetch_timeout_ms == 0 || self.fetch_timeout_ms >= self.timeout_ms {
            return Err(Error::InvalidConfig(format!(
                "fetch_timeout_ms ({}) must be in (0, timeout_ms ({}))",
                self.fetch_timeout_ms, self.timeout_ms
            )));
        }
        if self.http_timeout_ms == 0 || self.http_timeout_ms >= self.timeout_ms {
            return Err(Error::InvalidConfig(format!(
                "http_timeout_ms ({}) must be in (0, timeout_ms ({}))",
                self.http_timeout_ms, self.timeout_ms
            )));
        }
        if self.failure_domain_key.trim().is_empty() {
            return Err(Error::InvalidConfig("failure_domain_key is empty".into()));
        }
        if self.required_toleration_key.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "required_toleration_key is empty".into(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load from `$TCREADY_CONFIG` (or `tcready.toml`) and `TCREADY__*` env vars.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    /// Load from an explicit file; a missing file falls back to defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("TCREADY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            return Err(Error::InvalidConfig("log_level is empty".into()));
        }
        self.checker.validate()
    }
}
