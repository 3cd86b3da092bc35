//! Execution inside one long-lived container.

use std::fmt;
use std::sync::Arc;

use shiftkit_container::{
    Command, ContainerEngine, CopyPair, EngineError, ExecOptions, ExecOutput,
};
use tracing::{debug, info, warn};

use super::{ExecTarget, TARGET_TARGET};
use crate::descriptor::{CONTAINER_CONTEXT_ROOT, CONTAINER_SOURCE_ROOT, ContainerDescriptor};
use crate::error::EnvironmentError;
use crate::info::EnvironmentInfo;

/// A container owned by one environment.
///
/// The container is stopped and removed by [`ExecTarget::teardown`] or, if
/// that never ran, when the target is dropped.
pub struct ContainerTarget {
    name: String,
    engine: Arc<dyn ContainerEngine>,
    image: String,
    workdir: String,
    container_id: Option<String>,
}

impl fmt::Debug for ContainerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerTarget")
            .field("name", &self.name)
            .field("image", &self.image)
            .field("workdir", &self.workdir)
            .field("container_id", &self.container_id)
            .finish_non_exhaustive()
    }
}

impl ContainerTarget {
    /// Prepares the image, starts a container and copies the source tree
    /// and plugin directory into it.
    ///
    /// A missing image is built when the descriptor says how. If copying
    /// fails the new container is removed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::ContainerSetup`] when any step fails.
    pub fn start(
        engine: Arc<dyn ContainerEngine>,
        descriptor: &ContainerDescriptor,
        info: &EnvironmentInfo,
    ) -> Result<Self, EnvironmentError> {
        let image = descriptor.image.clone();
        let setup = |source: EngineError| EnvironmentError::ContainerSetup {
            image: image.clone(),
            source,
        };
        ensure_image(engine.as_ref(), descriptor, info).map_err(setup)?;
        let container_id = engine.create_container(&image).map_err(setup)?;
        info!(
            target: TARGET_TARGET,
            plugin = %info.name,
            image = %image,
            container = %container_id,
            "started plugin container"
        );
        let target = Self {
            name: info.name.clone(),
            engine,
            image: image.clone(),
            workdir: descriptor.workdir().to_owned(),
            container_id: Some(container_id.clone()),
        };
        target
            .engine
            .copy_dirs_into_container(
                &container_id,
                &[
                    CopyPair::new(&info.source, CONTAINER_SOURCE_ROOT),
                    CopyPair::new(&info.context, CONTAINER_CONTEXT_ROOT),
                ],
            )
            .map_err(setup)?;
        Ok(target)
    }

    /// Returns the container ID while the container is owned.
    #[must_use]
    pub fn container_id(&self) -> Option<&str> {
        self.container_id.as_deref()
    }

    /// Returns the image the container was created from.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    fn active_id(&self) -> Result<&str, EnvironmentError> {
        self.container_id
            .as_deref()
            .ok_or_else(|| EnvironmentError::NotActive {
                environment: self.name.clone(),
                reason: String::from("container was removed"),
            })
    }
}

impl ExecTarget for ContainerTarget {
    fn exec(&self, cmd: &Command, options: &ExecOptions) -> Result<ExecOutput, EnvironmentError> {
        if cmd.is_empty() {
            return Err(EnvironmentError::EmptyCommand);
        }
        let container_id = self.active_id()?;
        let options = if options.workdir().is_some() {
            options.clone()
        } else {
            options.clone().with_workdir(self.workdir.as_str())
        };
        debug!(
            target: TARGET_TARGET,
            container = container_id,
            command = %cmd,
            "running in container"
        );
        self.engine
            .exec_in_container(container_id, cmd, &options)
            .map_err(|err| EnvironmentError::from_engine(&self.name, err))
    }

    fn copy_out(&self, pairs: &[CopyPair]) -> Result<(), EnvironmentError> {
        let container_id = self.active_id()?;
        self.engine
            .copy_dirs_from_container(container_id, pairs)
            .map_err(|err| EnvironmentError::from_engine(&self.name, err))
    }

    fn is_container(&self) -> bool {
        true
    }

    fn teardown(&mut self) -> Result<(), EnvironmentError> {
        let Some(container_id) = self.container_id.take() else {
            return Ok(());
        };
        self.engine
            .stop_and_remove_container(&container_id)
            .map_err(EnvironmentError::Engine)?;
        info!(
            target: TARGET_TARGET,
            plugin = %self.name,
            container = %container_id,
            "removed plugin container"
        );
        Ok(())
    }
}

impl Drop for ContainerTarget {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            warn!(
                target: TARGET_TARGET,
                plugin = %self.name,
                error = %err,
                "failed to remove plugin container"
            );
        }
    }
}

fn ensure_image(
    engine: &dyn ContainerEngine,
    descriptor: &ContainerDescriptor,
    info: &EnvironmentInfo,
) -> Result<(), EngineError> {
    match (
        engine.inspect_image(&descriptor.image),
        descriptor.build.as_ref(),
    ) {
        (Ok(_), _) => Ok(()),
        (Err(EngineError::ImageNotFound { .. }), Some(build)) => {
            let context = info.context.join(&build.context);
            info!(
                target: TARGET_TARGET,
                image = %descriptor.image,
                context = %context.display(),
                "building missing plugin image"
            );
            engine.build_image(&descriptor.image, &context, &build.dockerfile)
        }
        (Err(err), _) => Err(err),
    }
}
