//! Execution targets: where an environment's commands actually run.

mod container;
mod host;

pub use container::ContainerTarget;
pub use host::HostTarget;

use shiftkit_container::{Command, CopyPair, ExecOptions, ExecOutput};

use crate::error::EnvironmentError;

/// Tracing target for execution targets.
pub(crate) const TARGET_TARGET: &str = "shiftkit_environment::target";

/// A place commands can be executed.
///
/// Commands arrive already translated to the target's path view.
pub trait ExecTarget: Send {
    /// Runs `cmd` and captures its output. A non-zero exit is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::NotActive`] when the target is gone, and
    /// other variants when the command could not be run.
    fn exec(&self, cmd: &Command, options: &ExecOptions) -> Result<ExecOutput, EnvironmentError>;

    /// Copies target directories back to the host.
    ///
    /// # Errors
    ///
    /// Returns the engine failure for the first pair that could not be copied.
    fn copy_out(&self, pairs: &[CopyPair]) -> Result<(), EnvironmentError>;

    /// Returns `true` for container-backed targets.
    fn is_container(&self) -> bool;

    /// Releases the target. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::Engine`] when a container could not be
    /// removed.
    fn teardown(&mut self) -> Result<(), EnvironmentError>;
}

#[cfg(test)]
mod tests;
