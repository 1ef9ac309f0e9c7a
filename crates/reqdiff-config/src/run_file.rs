//! YAML run files: hosts, commands and comparison options

use crate::env::RunConfig;
use crate::error::{ConfigError, ConfigResult};
use reqdiff_compare::ComparisonOptions;
use reqdiff_core::{host, HostSpec};
use reqdiff_exec::ExecutionMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// One run: every command against every host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFile {
    /// Host texts; an entry may hold several comma-separated hosts
    pub hosts: Vec<String>,
    /// Command texts, one per template
    pub commands: Vec<String>,
    #[serde(default)]
    pub options: ComparisonOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecutionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl RunFile {
    /// Parsed hosts in file order; the first is the default reference
    pub fn host_specs(&self) -> Vec<HostSpec> {
        host::parse_many(&self.hosts)
    }

    /// Apply this file's mode and timeout on top of `base`
    pub fn apply_to(&self, base: RunConfig) -> RunConfig {
        RunConfig {
            timeout: self.timeout_secs.map(Duration::from_secs).unwrap_or(base.timeout),
            mode: self.mode.unwrap_or(base.mode),
            ..base
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.host_specs().is_empty() {
            return Err(ConfigError::NoHosts);
        }
        if self.commands.iter().all(|c| c.trim().is_empty()) {
            return Err(ConfigError::NoCommands);
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "timeout_secs".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }
        Ok(())
    }
}

/// Load and validate a run file
pub fn load_run_file(path: impl AsRef<Path>) -> ConfigResult<RunFile> {
    let path = path.as_ref();
    debug!("Loading run file: {:?}", path);

    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse(&content, path)
}

/// Load and validate a run file from a string
pub fn load_run_string(content: &str) -> ConfigResult<RunFile> {
    parse(content, Path::new("<string>"))
}

fn parse(content: &str, source_path: &Path) -> ConfigResult<RunFile> {
    let mut run: RunFile = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
        path: source_path.to_path_buf(),
        source: e,
    })?;
    run.commands.retain(|c| !c.trim().is_empty());
    run.validate()?;

    debug!(
        hosts = run.hosts.len(),
        commands = run.commands.len(),
        "Loaded run file"
    );
    Ok(run)
}
