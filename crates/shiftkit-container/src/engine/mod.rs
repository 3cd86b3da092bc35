//! The container engine capability.
//!
//! [`ContainerEngine`] is the single seam between the substrate and a
//! container runtime. Exactly one implementation is selected per process by
//! [`ContainerSupport`](crate::ContainerSupport); callers receive it as an
//! `Arc<dyn ContainerEngine>`.

use std::path::{Path, PathBuf};

use crate::command::Command;
use crate::error::EngineError;
use crate::metadata::{FileInfo, ImageMetadata};
use crate::process::ExecOutput;

/// One directory transfer between the host and a container or image.
///
/// The direction is given by the operation the pair is passed to. Directory
/// contents are copied, so `host` and `container` name the two roots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CopyPair {
    host: PathBuf,
    container: String,
}

impl CopyPair {
    /// Creates a pair from a host directory and a container directory.
    #[must_use]
    pub fn new(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
        }
    }

    /// Returns the host-side directory.
    #[must_use]
    pub fn host(&self) -> &Path {
        &self.host
    }

    /// Returns the container-side directory.
    #[must_use]
    pub fn container(&self) -> &str {
        self.container.as_str()
    }
}

/// An environment variable passed to a containerised command.
pub type EnvVar = (String, String);

/// Working directory and environment for a containerised command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    workdir: Option<String>,
    env: Vec<EnvVar>,
}

impl ExecOptions {
    /// Creates options that inherit the image defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            workdir: None,
            env: Vec::new(),
        }
    }

    /// Sets the working directory. An empty directory keeps the image default.
    #[must_use]
    pub fn with_workdir(mut self, workdir: impl Into<String>) -> Self {
        let dir: String = workdir.into();
        self.workdir = (!dir.is_empty()).then_some(dir);
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Returns the working directory, if one was set.
    #[must_use]
    pub fn workdir(&self) -> Option<&str> {
        self.workdir.as_deref()
    }

    /// Returns the environment variables in insertion order.
    #[must_use]
    pub fn env(&self) -> &[EnvVar] {
        &self.env
    }
}

/// Operations the substrate needs from a container runtime.
///
/// Copy operations process pairs in order and stop at the first failing
/// pair, returning [`EngineError::CopyFailed`] that names it; pairs before it
/// are complete and the failing pair leaves no partial destination behind on
/// the host.
pub trait ContainerEngine: Send + Sync {
    /// Inspects a local image.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ImageNotFound`] when the image is absent.
    fn inspect_image(&self, image: &str) -> Result<ImageMetadata, EngineError>;

    /// Builds `image` from `dockerfile` (relative to `context`) and tags it.
    ///
    /// Re-running a successful build re-tags the image.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BuildFailed`] with the runtime diagnostics.
    fn build_image(&self, image: &str, context: &Path, dockerfile: &Path)
    -> Result<(), EngineError>;

    /// Removes a local image.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ImageNotFound`] when the image is absent.
    fn remove_image(&self, image: &str) -> Result<(), EngineError>;

    /// Derives `new_image` from `image` with host directories layered in.
    ///
    /// The source image is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CopyFailed`] for the first failing pair or any
    /// runtime error from the intermediate container.
    fn copy_dirs_into_image(
        &self,
        image: &str,
        new_image: &str,
        pairs: &[CopyPair],
    ) -> Result<(), EngineError>;

    /// Copies host directories into a running container.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CopyFailed`] for the first failing pair.
    fn copy_dirs_into_container(
        &self,
        container_id: &str,
        pairs: &[CopyPair],
    ) -> Result<(), EngineError>;

    /// Copies container directories out to the host.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CopyFailed`] for the first failing pair.
    fn copy_dirs_from_container(
        &self,
        container_id: &str,
        pairs: &[CopyPair],
    ) -> Result<(), EngineError>;

    /// Creates and starts a long-lived container from `image`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ContainerNotStarted`] when the runtime refuses.
    fn create_container(&self, image: &str) -> Result<String, EngineError>;

    /// Stops and removes a container; an already-removed container is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Runtime`] for any other runtime failure.
    fn stop_and_remove_container(&self, container_id: &str) -> Result<(), EngineError>;

    /// Runs `cmd` in a fresh container that is removed afterwards, whatever
    /// the command's outcome.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ContainerNotStarted`] when no container could be
    /// launched. A non-zero exit is reported through [`ExecOutput`].
    fn run_cmd_in_container(
        &self,
        image: &str,
        cmd: &Command,
        options: &ExecOptions,
    ) -> Result<ExecOutput, EngineError>;

    /// Runs `cmd` inside an existing, running container.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ContainerNotFound`] or
    /// [`EngineError::ContainerNotRunning`] when the container is gone.
    fn exec_in_container(
        &self,
        container_id: &str,
        cmd: &Command,
        options: &ExecOptions,
    ) -> Result<ExecOutput, EngineError>;

    /// Runs `cmd` in a container with `vol_src` bind-mounted at `vol_dest` and
    /// returns the combined output.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ContainerNotStarted`] when the container never
    /// started and [`EngineError::CommandFailed`] when it started but the
    /// command failed; [`EngineError::container_started`] tells them apart.
    fn run_container(
        &self,
        image: &str,
        cmd: &Command,
        vol_src: &Path,
        vol_dest: &str,
    ) -> Result<String, EngineError>;

    /// Reports metadata for `path` inside a container.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ContainerNotFound`] for a missing container and
    /// [`EngineError::PathNotFound`] for a missing path.
    fn stat(&self, container_id: &str, path: &str) -> Result<FileInfo, EngineError>;
}
