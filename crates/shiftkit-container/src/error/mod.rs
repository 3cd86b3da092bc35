//! Domain errors raised by container engine operations.
//!
//! Variants carry the image, container or path pair involved so callers can
//! decide per failure whether to retry, skip, or abandon a plugin.

use thiserror::Error;

use crate::process::ProcessError;

/// Errors arising from container engine operations.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// No supported container runtime is reachable.
    #[error("no working container runtime available (tried: {})", .tried.join(", "))]
    NoRuntime {
        /// Runtime binaries that were probed.
        tried: Vec<String>,
    },

    /// Containers were declined by the operator.
    #[error("container support is disabled")]
    Disabled,

    /// The image does not exist locally.
    #[error("image '{image}' not found")]
    ImageNotFound {
        /// Image reference.
        image: String,
    },

    /// The container does not exist (never created or already removed).
    #[error("container '{container}' not found")]
    ContainerNotFound {
        /// Container ID.
        container: String,
    },

    /// The container exists but is not running.
    #[error("container '{container}' is not running")]
    ContainerNotRunning {
        /// Container ID.
        container: String,
    },

    /// A path inside a container does not exist.
    #[error("path '{path}' not found in container '{container}'")]
    PathNotFound {
        /// Container ID.
        container: String,
        /// Path inside the container.
        path: String,
    },

    /// Building an image failed.
    #[error("failed to build image '{image}': {message}")]
    BuildFailed {
        /// Image tag being built.
        image: String,
        /// Runtime diagnostics.
        message: String,
    },

    /// One source/destination pair could not be copied.
    #[error("failed to copy '{src}' to '{dest}': {message}")]
    CopyFailed {
        /// Copy source.
        src: String,
        /// Copy destination.
        dest: String,
        /// Runtime or filesystem diagnostics.
        message: String,
    },

    /// A container never started.
    #[error("container for image '{image}' did not start: {message}")]
    ContainerNotStarted {
        /// Image the container was created from.
        image: String,
        /// Runtime diagnostics.
        message: String,
    },

    /// A container started but its command exited non-zero.
    #[error("command in image '{image}' exited with status {exit_code}")]
    CommandFailed {
        /// Image the container was created from.
        image: String,
        /// Exit status of the command.
        exit_code: i32,
        /// Combined output of the command.
        output: String,
    },

    /// The runtime reported an unexpected failure.
    #[error("{operation} failed: {message}")]
    Runtime {
        /// Runtime operation that failed.
        operation: &'static str,
        /// Runtime diagnostics.
        message: String,
    },

    /// The runtime returned output that could not be interpreted.
    #[error("unexpected output from {operation}: {message}")]
    InvalidOutput {
        /// Runtime operation that produced the output.
        operation: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// The runtime CLI could not be run.
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl EngineError {
    /// Returns `true` for the not-found family (image, container, path).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ImageNotFound { .. } | Self::ContainerNotFound { .. } | Self::PathNotFound { .. }
        )
    }

    /// Returns `true` when the container addressed by an operation is gone or
    /// stopped.
    #[must_use]
    pub const fn is_container_gone(&self) -> bool {
        matches!(
            self,
            Self::ContainerNotFound { .. } | Self::ContainerNotRunning { .. }
        )
    }

    /// For [`run_container`](crate::ContainerEngine::run_container) results:
    /// whether the container got as far as starting.
    #[must_use]
    pub const fn container_started(&self) -> bool {
        matches!(self, Self::CommandFailed { .. })
    }
}

#[cfg(test)]
mod tests;
