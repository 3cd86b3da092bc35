//! The per-plugin execution environment.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use shiftkit_container::{Command, ContainerEngine, CopyPair, ExecOptions, ExecOutput};
use tracing::debug;

use crate::descriptor::{CONTAINER_CONTEXT_ROOT, CONTAINER_SOURCE_ROOT, ContainerDescriptor};
use crate::error::EnvironmentError;
use crate::info::EnvironmentInfo;
use crate::paths::PathTranslator;
use crate::target::{ContainerTarget, ExecTarget, HostTarget};

/// Tracing target for environment operations.
const ENVIRONMENT_TARGET: &str = "shiftkit_environment::environment";

/// Variable carrying the question-answering service address into commands.
pub const QA_RPC_ADDR_ENV: &str = "SHIFTKIT_QA_RPC_ADDR";

/// Owns one execution target for the lifetime of a plugin instance.
///
/// Commands are serialised by the caller: an environment is not meant to be
/// driven from several threads at once.
pub struct Environment {
    info: EnvironmentInfo,
    qa_addr: Option<SocketAddr>,
    translator: PathTranslator,
    target: Box<dyn ExecTarget>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("info", &self.info)
            .field("qa_addr", &self.qa_addr)
            .field("translator", &self.translator)
            .field("container", &self.target.is_container())
            .finish_non_exhaustive()
    }
}

impl Environment {
    /// Creates an environment that runs commands on the host from the
    /// plugin directory.
    #[must_use]
    pub fn host(
        info: EnvironmentInfo,
        qa_addr: Option<SocketAddr>,
        exec_timeout: Option<Duration>,
    ) -> Self {
        let target = HostTarget::new(info.context.clone(), exec_timeout);
        Self::from_target(info, qa_addr, PathTranslator::identity(), Box::new(target))
    }

    /// Creates an environment backed by a new container.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::ContainerSetup`] when the image cannot be
    /// prepared or the container cannot be started and populated.
    pub fn container(
        info: EnvironmentInfo,
        qa_addr: Option<SocketAddr>,
        descriptor: &ContainerDescriptor,
        engine: Arc<dyn ContainerEngine>,
    ) -> Result<Self, EnvironmentError> {
        let target = ContainerTarget::start(engine, descriptor, &info)?;
        let translator = PathTranslator::identity()
            .with_root(info.source.clone(), CONTAINER_SOURCE_ROOT)
            .with_root(info.context.clone(), CONTAINER_CONTEXT_ROOT);
        Ok(Self::from_target(info, qa_addr, translator, Box::new(target)))
    }

    /// Creates an environment over an arbitrary target.
    #[must_use]
    pub fn from_target(
        info: EnvironmentInfo,
        qa_addr: Option<SocketAddr>,
        translator: PathTranslator,
        target: Box<dyn ExecTarget>,
    ) -> Self {
        Self {
            info,
            qa_addr,
            translator,
            target,
        }
    }

    /// Runs `cmd` as given.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::NotActive`] when the target is gone; a
    /// command that ran and exited non-zero is reported through
    /// [`ExecOutput::exit_code`] instead.
    pub fn exec(&self, cmd: &Command) -> Result<ExecOutput, EnvironmentError> {
        let mut options = ExecOptions::new();
        if let Some(addr) = self.qa_addr {
            options = options.with_env(QA_RPC_ADDR_ENV, addr.to_string());
        }
        let output = self.target.exec(cmd, &options)?;
        debug!(
            target: ENVIRONMENT_TARGET,
            plugin = %self.info.name,
            command = %cmd,
            exit_code = output.exit_code(),
            "command finished"
        );
        Ok(output)
    }

    /// Runs `cmd` with a host path appended as its last argument.
    ///
    /// The path is translated to the target's view first; an empty path is
    /// passed through as an empty argument.
    ///
    /// # Errors
    ///
    /// As for [`Environment::exec`].
    pub fn exec_with_path(
        &self,
        cmd: &Command,
        host_path: &str,
    ) -> Result<ExecOutput, EnvironmentError> {
        let argument = if host_path.is_empty() {
            String::new()
        } else {
            self.encode(Path::new(host_path))
        };
        self.exec(&cmd.with_arg(argument))
    }

    /// Translates a host path to the target's view.
    #[must_use]
    pub fn encode(&self, host_path: &Path) -> String {
        self.translator.encode(host_path)
    }

    /// Translates a target path back to the host for diagnostics.
    #[must_use]
    pub fn decode(&self, target_path: &str) -> PathBuf {
        self.translator.decode(target_path)
    }

    /// Copies directories out of the target. Host environments have nothing
    /// to copy.
    ///
    /// # Errors
    ///
    /// Returns the failure for the first pair that could not be copied.
    pub fn copy_out(&self, pairs: &[CopyPair]) -> Result<(), EnvironmentError> {
        self.target.copy_out(pairs)
    }

    /// Releases the target, removing the container if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::Engine`] when the container could not be
    /// removed.
    pub fn destroy(&mut self) -> Result<(), EnvironmentError> {
        debug!(target: ENVIRONMENT_TARGET, plugin = %self.info.name, "destroying environment");
        self.target.teardown()
    }

    /// Returns the plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Returns the host-side description.
    #[must_use]
    pub const fn info(&self) -> &EnvironmentInfo {
        &self.info
    }

    /// Returns the host source root.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.info.source
    }

    /// Returns the plugin directory on the host.
    #[must_use]
    pub fn context(&self) -> &Path {
        &self.info.context
    }

    /// Returns the templates directory relative to the plugin directory.
    #[must_use]
    pub fn rel_templates_dir(&self) -> &Path {
        &self.info.rel_templates_dir
    }

    /// Returns the question-answering service address, if any.
    #[must_use]
    pub const fn qa_addr(&self) -> Option<SocketAddr> {
        self.qa_addr
    }

    /// Returns `true` when commands run in a container.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.target.is_container()
    }
}

#[cfg(test)]
mod tests;
