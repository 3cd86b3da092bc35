//! Errors raised by execution environments.

use shiftkit_container::{EngineError, ProcessError};
use thiserror::Error;

/// Errors arising while preparing or using an execution environment.
#[derive(Debug, Clone, Error)]
pub enum EnvironmentError {
    /// The backing target is gone or never started.
    ///
    /// Callers treat this as "skip this unit of work", not as a failure of
    /// the command itself.
    #[error("environment '{environment}' is not active: {reason}")]
    NotActive {
        /// Environment name.
        environment: String,
        /// Why the target is unavailable.
        reason: String,
    },

    /// A command without a program was submitted.
    #[error("cannot execute an empty command")]
    EmptyCommand,

    /// The command exceeded the configured execution timeout.
    #[error("'{program}' timed out after {timeout_secs}s")]
    Timeout {
        /// Program that was killed.
        program: String,
        /// Budget in seconds.
        timeout_secs: u64,
    },

    /// The command could not be run on the host.
    #[error(transparent)]
    Process(ProcessError),

    /// The container for the environment could not be prepared.
    #[error("failed to prepare container from image '{image}': {source}")]
    ContainerSetup {
        /// Image the container was created from.
        image: String,
        /// Underlying engine failure.
        #[source]
        source: EngineError,
    },

    /// A container engine operation failed.
    #[error(transparent)]
    Engine(EngineError),
}

impl EnvironmentError {
    /// Returns `true` for [`EnvironmentError::NotActive`].
    #[must_use]
    pub const fn is_not_active(&self) -> bool {
        matches!(self, Self::NotActive { .. })
    }

    /// Maps an engine failure raised while running a command in
    /// `environment`.
    #[must_use]
    pub fn from_engine(environment: &str, error: EngineError) -> Self {
        match error {
            error if error.is_container_gone() => Self::NotActive {
                environment: environment.to_owned(),
                reason: error.to_string(),
            },
            EngineError::Process(process) => Self::from(process),
            other => Self::Engine(other),
        }
    }
}

impl From<ProcessError> for EnvironmentError {
    fn from(error: ProcessError) -> Self {
        match error {
            ProcessError::Timeout {
                program,
                timeout_secs,
            } => Self::Timeout {
                program,
                timeout_secs,
            },
            other => Self::Process(other),
        }
    }
}

#[cfg(test)]
mod tests;
