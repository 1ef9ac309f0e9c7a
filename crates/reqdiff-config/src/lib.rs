//! Configuration for reqdiff
//!
//! Two sources, later overriding earlier:
//!
//! - environment variables, read by [`RunConfig::from_env`]
//! - a YAML run file naming hosts, commands and comparison options
//!
//! ```yaml
//! hosts:
//!   - api.example.com
//!   - staging.example.com:8080
//! commands:
//!   - curl {host}/users
//!   - curl -X POST -d '{"name":"ada"}' {host}/users
//! mode: per-template
//! timeout_secs: 10
//! options:
//!   ignore_timestamps: true
//!   ignored_paths: ["$.meta"]
//! ```

mod env;
mod error;
mod run_file;

pub use env::{RunConfig, ENV_MODE, ENV_PROXY_FALLBACK, ENV_TIMEOUT_SECS};
pub use error::{ConfigError, ConfigResult};
pub use run_file::{load_run_file, load_run_string, RunFile};
