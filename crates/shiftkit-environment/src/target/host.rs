//! Host process execution.

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use shiftkit_container::{Command, CopyPair, ExecOptions, ExecOutput, run_captured};
use tracing::debug;

use super::{ExecTarget, TARGET_TARGET};
use crate::error::EnvironmentError;

/// Runs commands as child processes of the current process.
#[derive(Debug, Clone)]
pub struct HostTarget {
    workdir: PathBuf,
    timeout: Option<Duration>,
}

impl HostTarget {
    /// Creates a target running commands from `workdir`.
    #[must_use]
    pub fn new(workdir: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            workdir: workdir.into(),
            timeout,
        }
    }

    /// Returns the default working directory.
    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

impl ExecTarget for HostTarget {
    fn exec(&self, cmd: &Command, options: &ExecOptions) -> Result<ExecOutput, EnvironmentError> {
        let program = cmd.program().ok_or(EnvironmentError::EmptyCommand)?;
        let workdir = options.workdir().map_or(self.workdir.as_path(), Path::new);
        let mut command = process::Command::new(resolve_program(program, workdir));
        command
            .args(cmd.args())
            .current_dir(workdir)
            .envs(options.env().iter().map(|(key, value)| (key, value)));
        debug!(
            target: TARGET_TARGET,
            command = %cmd,
            workdir = %workdir.display(),
            "running on host"
        );
        Ok(run_captured(command, self.timeout)?)
    }

    fn copy_out(&self, _pairs: &[CopyPair]) -> Result<(), EnvironmentError> {
        Ok(())
    }

    fn is_container(&self) -> bool {
        false
    }

    fn teardown(&mut self) -> Result<(), EnvironmentError> {
        Ok(())
    }
}

/// Relative programs with a directory part resolve against the working
/// directory; bare names are left for `PATH` lookup.
pub(super) fn resolve_program(program: &str, workdir: &Path) -> PathBuf {
    let path = Path::new(program);
    if path.is_relative() && path.components().count() > 1 {
        workdir.join(path)
    } else {
        path.to_path_buf()
    }
}
