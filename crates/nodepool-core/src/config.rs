//! Scaler configuration: target config maps and the TOML config file.
//!
//! A target plugin hands the scaler a flat `string → string` map; the
//! [`ScaleInRequest::from_target_config`] constructor turns that into a typed
//! request. Longer-lived settings (busy oracle address, self node identity)
//! come from a TOML file parsed into [`ScalerConfig`].

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ScaleInError;
use crate::types::{
    DEFAULT_DRAIN_DEADLINE, NodeIdStrategy, PoolIdentifier, RemoteProvider, ScaleInRequest,
};

pub const CONFIG_KEY_NODE_CLASS: &str = "node_class";
pub const CONFIG_KEY_DATACENTER: &str = "datacenter";
pub const CONFIG_KEY_DRAIN_DEADLINE: &str = "node_drain_deadline";
pub const CONFIG_KEY_STRATEGY: &str = "node_selector_strategy";
pub const CONFIG_KEY_REMOTE_PROVIDER: &str = "remote_provider";

/// Errors raised while reading scaler configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required config param {0:?} not found")]
    MissingParam(String),

    #[error("failed to parse {0:?} as time duration")]
    Duration(String),

    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Request(#[from] ScaleInError),
}

impl ScaleInRequest {
    /// Build a request from a target plugin's config map.
    ///
    /// `count` arrives signed from the plugin boundary; negative values are
    /// rejected.
    pub fn from_target_config(
        count: i64,
        config: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let count = usize::try_from(count).map_err(|_| {
            ScaleInError::Validation(format!("node count must not be negative, got {count}"))
        })?;

        let pool = if let Some(class) = config.get(CONFIG_KEY_NODE_CLASS) {
            PoolIdentifier::class(class.as_str())
        } else if let Some(dc) = config.get(CONFIG_KEY_DATACENTER) {
            PoolIdentifier::datacenter(dc.as_str())
        } else {
            return Err(ConfigError::MissingParam(CONFIG_KEY_NODE_CLASS.to_string()));
        };

        let drain_deadline = match config.get(CONFIG_KEY_DRAIN_DEADLINE) {
            Some(raw) => parse_duration(raw).ok_or_else(|| ConfigError::Duration(raw.clone()))?,
            None => DEFAULT_DRAIN_DEADLINE,
        };

        let strategy = match config.get(CONFIG_KEY_STRATEGY) {
            Some(raw) => raw.parse::<NodeIdStrategy>()?,
            None => NodeIdStrategy::default(),
        };

        let remote_provider = match config.get(CONFIG_KEY_REMOTE_PROVIDER) {
            Some(raw) => raw.parse::<RemoteProvider>()?,
            None => RemoteProvider::default(),
        };

        Ok(ScaleInRequest {
            count,
            pool,
            remote_provider,
            strategy,
            drain_deadline,
        })
    }
}

/// Scaler settings loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalerConfig {
    /// Node the scaler runs on; never selected for removal.
    pub exclude_node_id: Option<String>,
    #[serde(default)]
    pub oracle: OracleConfig,
}

/// Connection settings for the HTTP busy-node oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Base URL, e.g. `http://127.0.0.1:4646`.
    pub address: String,
    /// Token sent with every request.
    pub secret_id: Option<String>,
    /// Per-request timeout (e.g. "10s").
    pub timeout: String,
    /// Blocking-query wait forwarded to the oracle (e.g. "5s").
    pub wait_time: Option<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:4646".to_string(),
            secret_id: None,
            timeout: "10s".to_string(),
            wait_time: None,
        }
    }
}

impl OracleConfig {
    /// Parsed per-request timeout.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.timeout).ok_or_else(|| ConfigError::Duration(self.timeout.clone()))
    }

    /// Parsed blocking-query wait, if configured.
    pub fn wait_time(&self) -> Result<Option<Duration>, ConfigError> {
        self.wait_time
            .as_deref()
            .map(|raw| parse_duration(raw).ok_or_else(|| ConfigError::Duration(raw.to_string())))
            .transpose()
    }
}

impl ScalerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ScalerConfig = toml::from_str(content)?;
        // Surface malformed durations at load time rather than first use.
        config.oracle.timeout()?;
        config.oracle.wait_time()?;
        Ok(config)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Parse a duration string like "500ms", "30s", "5m", "1h".
///
/// A bare number is read as seconds. Values that overflow are rejected.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
