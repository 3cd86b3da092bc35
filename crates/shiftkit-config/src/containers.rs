//! Operator policy for container-backed plugin execution.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which container runtime the engine discovery should look for.
///
/// `Auto` tries docker first and podman second.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RuntimePreference {
    /// Use whichever supported runtime is found first.
    #[default]
    Auto,
    /// Only consider docker.
    Docker,
    /// Only consider podman.
    Podman,
}

/// Operator answer to "may containers be spawned?".
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SpawnPolicy {
    /// Defer to the interactive consent gate at startup.
    #[default]
    Ask,
    /// Spawn containers without asking.
    Always,
    /// Never spawn containers.
    Never,
}

impl SpawnPolicy {
    /// Returns the configured answer, or `None` when the operator must be asked.
    #[must_use]
    pub const fn decision(self) -> Option<bool> {
        match self {
            Self::Ask => None,
            Self::Always => Some(true),
            Self::Never => Some(false),
        }
    }
}

/// Container settings shared by every plugin in the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerPolicy {
    /// Operator answer to the consent question.
    ///
    /// `None` defers to the interactive consent gate at startup.
    pub spawn: Option<bool>,
    /// Runtime discovery preference.
    pub runtime: RuntimePreference,
}

impl ContainerPolicy {
    /// Returns the operator override, if one was configured.
    #[must_use]
    pub const fn spawn(&self) -> Option<bool> {
        self.spawn
    }

    /// Returns the runtime discovery preference.
    #[must_use]
    pub const fn runtime(&self) -> RuntimePreference {
        self.runtime
    }
}
