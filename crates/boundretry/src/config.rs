//! Serde-backed retry configuration
//!
//! Retry policies can be described in YAML or JSON and converted into a
//! [`RetryPolicy`] for the executor:
//!
//! ```yaml
//! default:
//!   max-attempts: 3
//!   base-delay-ms: 200
//! operations:
//!   download:
//!     max-attempts: 5
//!     base-delay-ms: 1000
//!     jitter-ms: 250
//!     scale-factor: 1.0
//!     max-delay-ms: 30000
//! ```
//!
//! Values can then be overridden from the environment with
//! [`RetryConfig::apply_env_overrides`].

use camino::Utf8Path;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Retry settings for one operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Total attempts including the first; 0 means one, negative means unlimited
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,

    /// Delay before the first retry in milliseconds
    #[serde(default)]
    pub base_delay_ms: u64,

    /// Maximum jitter in milliseconds
    #[serde(default)]
    pub jitter_ms: u64,

    /// Growth factor; each delay is `(1 + scale-factor)` times the previous one
    #[serde(default)]
    pub scale_factor: f64,

    /// Delay ceiling in milliseconds, applied before jitter (0 = none)
    #[serde(default)]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: 0,
            jitter_ms: 0,
            scale_factor: 0.0,
            max_delay_ms: 0,
        }
    }
}

fn default_max_attempts() -> i32 {
    1
}

impl RetryConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` files are parsed as JSON, anything else as YAML
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let config: Self = load_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `{PREFIX}_MAX_ATTEMPTS`, `{PREFIX}_BASE_DELAY_MS`,
    /// `{PREFIX}_JITTER_MS`, `{PREFIX}_SCALE_FACTOR` and `{PREFIX}_MAX_DELAY_MS`
    pub fn apply_env_overrides(mut self, prefix: &str) -> Result<Self> {
        if let Some(val) = env_value(prefix, "MAX_ATTEMPTS")? {
            self.max_attempts = val;
        }

        if let Some(val) = env_value(prefix, "BASE_DELAY_MS")? {
            self.base_delay_ms = val;
        }

        if let Some(val) = env_value(prefix, "JITTER_MS")? {
            self.jitter_ms = val;
        }

        if let Some(val) = env_value(prefix, "SCALE_FACTOR")? {
            self.scale_factor = val;
        }

        if let Some(val) = env_value(prefix, "MAX_DELAY_MS")? {
            self.max_delay_ms = val;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check values that deserialize fine but make no sense as a policy
    pub fn validate(&self) -> Result<()> {
        if !self.scale_factor.is_finite() {
            return Err(Error::invalid_config("scale-factor must be a finite number"));
        }
        if self.scale_factor < 0.0 {
            return Err(Error::invalid_config(format!(
                "scale-factor must be >= 0, got {}",
                self.scale_factor
            )));
        }
        Ok(())
    }

    /// Convert into the policy consumed by the executor
    pub fn into_policy(self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            jitter: Duration::from_millis(self.jitter_ms),
            scale_factor: self.scale_factor,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        config.into_policy()
    }
}

/// A default policy plus named per-operation policies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPoliciesConfig {
    /// Policy for operations without their own entry
    #[serde(default)]
    pub default: RetryConfig,

    /// Per-operation policies
    #[serde(default)]
    pub operations: HashMap<String, RetryConfig>,
}

impl RetryPoliciesConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` files are parsed as JSON, anything else as YAML
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let config: Self = load_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the default and every operation entry
    pub fn validate(&self) -> Result<()> {
        self.default.validate()?;
        for (name, config) in &self.operations {
            config.validate().map_err(|e| {
                Error::invalid_config(format!("operation '{}': {}", name, e))
            })?;
        }
        Ok(())
    }

    /// Policy for `operation`, falling back to the default
    pub fn policy_for(&self, operation: &str) -> RetryPolicy {
        self.operations
            .get(operation)
            .unwrap_or(&self.default)
            .clone()
            .into_policy()
    }
}

fn load_file<T: DeserializeOwned>(path: &Utf8Path) -> Result<T> {
    if !path.exists() {
        return Err(Error::config_not_found(path.as_str()));
    }

    let content = fs::read_to_string(path)?;
    let config = match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("json") => serde_json::from_str(&content)?,
        _ => serde_yaml_ng::from_str(&content)?,
    };

    tracing::debug!("Loaded retry configuration from {}", path);
    Ok(config)
}

fn env_value<T: FromStr>(prefix: &str, suffix: &str) -> Result<Option<T>> {
    let name = format!("{}_{}", prefix, suffix);
    match env::var(&name) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::invalid_config(format!("{} must be a valid number", name))),
        Err(_) => Ok(None),
    }
}
