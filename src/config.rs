//! Configuration management for the limiter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{LimiterError, Result};
use crate::ratelimit::{preset_rules, PolicyRule, PolicySet};

/// Prefix for environment overrides, e.g. `EMBER__SWEEP__INTERVAL_SECS=60`.
pub const ENV_PREFIX: &str = "EMBER";

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Expiry sweep configuration
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Named policies available to callers
    #[serde(default = "preset_rules")]
    pub policies: BTreeMap<String, PolicyRule>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            sweep: SweepConfig::default(),
            logging: LoggingConfig::default(),
            policies: preset_rules(),
        }
    }
}

/// Sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between sweeps
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval(),
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_sweep_interval() -> u64 {
    300
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LimiterConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading limiter configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: LimiterConfig = serde_yaml::from_str(yaml)
            .map_err(|e| LimiterError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Layer an optional config file and `EMBER__*` environment variables
    /// over the defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            info!(path = %path, "Loading limiter configuration");
            builder = builder.add_source(config::File::with_name(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: LimiterConfig = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| LimiterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the limiter cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sweep.interval_secs == 0 {
            return Err(LimiterError::Config(
                "sweep.interval_secs must be greater than 0".to_string(),
            ));
        }
        self.policy_set().map(|_| ())
    }

    /// Build the validated set of named policies.
    pub fn policy_set(&self) -> Result<PolicySet> {
        PolicySet::from_rules(&self.policies)
    }
}
