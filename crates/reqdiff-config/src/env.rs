//! Settings read from the environment

use crate::error::{ConfigError, ConfigResult};
use reqdiff_exec::{ExecutionMode, DEFAULT_TIMEOUT};
use std::env;
use std::time::Duration;
use tracing::debug;

pub const ENV_TIMEOUT_SECS: &str = "REQDIFF_TIMEOUT_SECS";
pub const ENV_MODE: &str = "REQDIFF_MODE";
pub const ENV_PROXY_FALLBACK: &str = "REQDIFF_PROXY_FALLBACK";

/// How a run is executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Per-request timeout
    pub timeout: Duration,
    pub mode: ExecutionMode,
    /// Retry failed direct calls once through the local proxy
    pub proxy_fallback: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            mode: ExecutionMode::default(),
            proxy_fallback: false,
        }
    }
}

impl RunConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout = parse_timeout(ENV_TIMEOUT_SECS, raw.trim())?;
        }

        if let Some(raw) = lookup(ENV_MODE) {
            config.mode = raw
                .parse::<ExecutionMode>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: ENV_MODE.to_string(),
                    reason: e.to_string(),
                })?;
        }

        if let Some(raw) = lookup(ENV_PROXY_FALLBACK) {
            config.proxy_fallback = parse_flag(ENV_PROXY_FALLBACK, raw.trim())?;
        }

        debug!(?config, "Loaded run configuration");
        Ok(config)
    }
}

fn parse_timeout(key: &str, raw: &str) -> ConfigResult<Duration> {
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: "timeout must be at least one second".to_string(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("'{raw}' is not a number of seconds: {e}"),
        }),
    }
}

fn parse_flag(key: &str, raw: &str) -> ConfigResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("'{raw}' is not a boolean"),
        }),
    }
}
