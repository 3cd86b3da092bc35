//! Shared configuration for the shiftkit plugin substrate.
//!
//! [`Config`] carries the ambient settings every crate in the workspace
//! consults: the log filter and format, the operator's container policy, and
//! an optional wall-clock budget for plugin commands. Values are layered by
//! `ortho_config` from defaults, configuration files, `SHIFTKIT_*`
//! environment variables and command-line flags. Malformed values fail the
//! load so a typo never silently changes container behaviour.

mod containers;
mod defaults;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use containers::{ContainerPolicy, RuntimePreference, SpawnPolicy};
pub use defaults::{DEFAULT_LOG_FILTER, default_log_filter_string, default_log_format};
pub use logging::{LogFormat, LogFormatParseError};

/// Prefix shared by every environment variable the loader reads.
pub const ENV_PREFIX: &str = "SHIFTKIT_";

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SHIFTKIT")]
pub struct Config {
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format of the log subscriber.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Whether containers may be spawned without asking.
    #[serde(default)]
    #[ortho_config(default = SpawnPolicy::Ask)]
    pub spawn_containers: SpawnPolicy,
    /// Runtime discovery preference.
    #[serde(default)]
    #[ortho_config(default = RuntimePreference::Auto)]
    pub container_runtime: RuntimePreference,
    /// Upper bound for a single plugin command, in seconds. Zero disables it.
    #[serde(default)]
    #[ortho_config(default = 0)]
    pub exec_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            spawn_containers: SpawnPolicy::Ask,
            container_runtime: RuntimePreference::Auto,
            exec_timeout_secs: 0,
        }
    }
}

impl Config {
    /// Returns the log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the container policy.
    #[must_use]
    pub const fn containers(&self) -> ContainerPolicy {
        ContainerPolicy {
            spawn: self.spawn_containers.decision(),
            runtime: self.container_runtime,
        }
    }

    /// Returns the command timeout, when one is configured.
    #[must_use]
    pub fn exec_timeout(&self) -> Option<Duration> {
        (self.exec_timeout_secs > 0).then_some(Duration::from_secs(self.exec_timeout_secs))
    }
}
