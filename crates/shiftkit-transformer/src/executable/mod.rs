//! Command-line plugins speaking the detect/transform protocol.
//!
//! An [`Executable`] exists only in the initialised state: [`Executable::init`]
//! either returns a ready plugin or fails without leaving anything behind,
//! and [`Executable::finish`] consumes it, releasing its environment.
//!
//! Detection and transformation absorb plugin failures. A failing command,
//! a non-zero exit or unreadable output is logged and contributes nothing;
//! only a vanished environment during detection is reported to the caller.

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use shiftkit_container::{Command, ContainerEngine, ContainerSupport};
use shiftkit_environment::{Environment, EnvironmentInfo};
use tracing::{debug, error, info, warn};

use crate::config::{ExecutableConfig, TransformerConfig};
use crate::detect::parse_detect_output;
use crate::error::TransformerError;
use crate::qa::QaReceiver;
use crate::types::{
    Artifact, DEFAULT_SOURCE_DIR, PathMapping, PathMappingType, Services, TransformOutput,
};

/// Tracing target for plugin execution.
const EXECUTABLE_TARGET: &str = "shiftkit_transformer::executable";

/// Detection and transformation as consumed by the migration driver.
pub trait Transformer {
    /// Returns the transformer definition and the environment it runs in.
    fn config(&self) -> (&TransformerConfig, &Environment);

    /// Detects services in `dir`.
    ///
    /// Plugins without a detect command detect nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TransformerError::EnvironmentNotActive`] when the plugin's
    /// environment is gone. Every other failure yields an empty result.
    fn directory_detect(&self, dir: &Path) -> Result<Services, TransformerError>;

    /// Transforms each new artifact independently and concatenates the
    /// results. Artifacts that fail contribute nothing.
    fn transform(&self, new_artifacts: &[Artifact], already_seen: &[Artifact]) -> TransformOutput;
}

/// Collaborators and host facts used to initialise plugins.
pub struct ExecutableLoader<'a> {
    containers: &'a ContainerSupport,
    qa: Option<&'a dyn QaReceiver>,
    exec_timeout: Option<Duration>,
    platform: &'a str,
}

impl fmt::Debug for ExecutableLoader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableLoader")
            .field("containers", self.containers)
            .field("qa", &self.qa.is_some())
            .field("exec_timeout", &self.exec_timeout)
            .field("platform", &self.platform)
            .finish()
    }
}

enum Placement {
    Host,
    Container(Arc<dyn ContainerEngine>),
}

impl<'a> ExecutableLoader<'a> {
    /// Creates a loader for the current host platform without QA support.
    #[must_use]
    pub const fn new(containers: &'a ContainerSupport) -> Self {
        Self {
            containers,
            qa: None,
            exec_timeout: None,
            platform: std::env::consts::OS,
        }
    }

    /// Uses `qa` for plugins that enable question answering.
    #[must_use]
    pub const fn with_qa(mut self, qa: &'a dyn QaReceiver) -> Self {
        self.qa = Some(qa);
        self
    }

    /// Bounds host commands. Container commands are bounded by the engine.
    #[must_use]
    pub const fn with_exec_timeout(mut self, exec_timeout: Option<Duration>) -> Self {
        self.exec_timeout = exec_timeout;
        self
    }

    /// Overrides the host platform identifier.
    #[must_use]
    pub const fn with_platform(mut self, platform: &'a str) -> Self {
        self.platform = platform;
        self
    }

    /// Initialises a plugin.
    ///
    /// The declared container is used when containers are available; the
    /// host is used otherwise, provided the plugin supports this platform.
    ///
    /// # Errors
    ///
    /// Returns [`TransformerError::InvalidConfig`] for malformed
    /// configuration, [`TransformerError::UnsupportedPlatform`] when nothing
    /// can run the plugin and [`TransformerError::Environment`] when the
    /// environment cannot be created.
    pub fn load(
        &self,
        config: TransformerConfig,
        info: EnvironmentInfo,
    ) -> Result<Executable, TransformerError> {
        let exec_config = ExecutableConfig::from_value(&config.config).map_err(|err| {
            error!(
                target: EXECUTABLE_TARGET,
                plugin = %config.name,
                error = %err,
                "unable to load transformer configuration"
            );
            TransformerError::InvalidConfig {
                name: config.name.clone(),
                source: Arc::new(err),
            }
        })?;
        let placement = self.placement(&config.name, &exec_config)?;
        let qa_addr = if exec_config.enable_qa {
            self.start_qa(&config.name)
        } else {
            None
        };
        let created = match placement {
            Placement::Container(engine) => {
                Environment::container(info, qa_addr, &exec_config.container, engine)
            }
            Placement::Host => Ok(Environment::host(info, qa_addr, self.exec_timeout)),
        };
        let env = created.map_err(|source| {
            error!(
                target: EXECUTABLE_TARGET,
                plugin = %config.name,
                error = %source,
                "unable to create execution environment"
            );
            TransformerError::Environment {
                name: config.name.clone(),
                source,
            }
        })?;
        info!(
            target: EXECUTABLE_TARGET,
            plugin = %config.name,
            container = env.is_container(),
            qa = qa_addr.is_some(),
            "transformer initialised"
        );
        Ok(Executable {
            config,
            exec_config,
            env,
        })
    }

    fn placement(
        &self,
        name: &str,
        exec_config: &ExecutableConfig,
    ) -> Result<Placement, TransformerError> {
        if exec_config.has_container()
            && let Some(engine) = self.containers.engine()
        {
            return Ok(Placement::Container(engine));
        }
        let reason = if !exec_config.has_container() {
            "no container image declared"
        } else if self.containers.is_disabled() {
            "container support is disabled"
        } else {
            "no container engine is available"
        };
        if exec_config.supports_platform(self.platform) {
            if exec_config.has_container() {
                info!(
                    target: EXECUTABLE_TARGET,
                    plugin = name,
                    reason,
                    "running containerised transformer on the host"
                );
            }
            return Ok(Placement::Host);
        }
        Err(TransformerError::UnsupportedPlatform {
            name: name.to_owned(),
            platform: self.platform.to_owned(),
            reason: reason.to_owned(),
        })
    }

    fn start_qa(&self, name: &str) -> Option<SocketAddr> {
        let Some(receiver) = self.qa else {
            warn!(
                target: EXECUTABLE_TARGET,
                plugin = name,
                "question answering requested but no receiver is configured"
            );
            return None;
        };
        match receiver.start() {
            Ok(addr) => Some(addr),
            Err(err) => {
                error!(
                    target: EXECUTABLE_TARGET,
                    plugin = name,
                    error = %err,
                    "unable to start QA receiver"
                );
                info!(target: EXECUTABLE_TARGET, plugin = name, "starting transformer without QA");
                None
            }
        }
    }
}

/// An initialised command-line plugin.
#[derive(Debug)]
pub struct Executable {
    config: TransformerConfig,
    exec_config: ExecutableConfig,
    env: Environment,
}

impl Executable {
    /// Initialises a plugin through `loader`.
    ///
    /// # Errors
    ///
    /// See [`ExecutableLoader::load`].
    pub fn init(
        config: TransformerConfig,
        info: EnvironmentInfo,
        loader: &ExecutableLoader<'_>,
    ) -> Result<Self, TransformerError> {
        loader.load(config, info)
    }

    /// Assembles a plugin from already prepared parts.
    #[must_use]
    pub const fn from_parts(
        config: TransformerConfig,
        exec_config: ExecutableConfig,
        env: Environment,
    ) -> Self {
        Self {
            config,
            exec_config,
            env,
        }
    }

    /// Returns the decoded plugin configuration.
    #[must_use]
    pub const fn exec_config(&self) -> &ExecutableConfig {
        &self.exec_config
    }

    /// Returns the plugin's environment.
    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.env
    }

    /// Finishes processing and releases the environment.
    ///
    /// # Errors
    ///
    /// Returns [`TransformerError::Teardown`] when a container could not be
    /// removed.
    pub fn finish(mut self) -> Result<(), TransformerError> {
        self.env
            .destroy()
            .map_err(|source| TransformerError::Teardown {
                name: self.config.name.clone(),
                source,
            })
    }

    fn template_mappings(&self, artifact: &Artifact) -> Option<TransformOutput> {
        let Some(service_dir) = artifact.service_dir() else {
            error!(
                target: EXECUTABLE_TARGET,
                plugin = %self.config.name,
                "artifact has no service directory"
            );
            return None;
        };
        let Ok(relative) = Path::new(service_dir).strip_prefix(self.env.source()) else {
            error!(
                target: EXECUTABLE_TARGET,
                plugin = %self.config.name,
                dir = service_dir,
                source_root = %self.env.source().display(),
                "unable to make service directory relative to the source root"
            );
            return None;
        };
        let template = PathMapping::new(
            PathMappingType::Template,
            self.env.info().templates_dir().display().to_string(),
            output_source_path(relative),
        )
        .with_template_config(artifact.template_config().cloned());
        let source = PathMapping::new(PathMappingType::Source, "", DEFAULT_SOURCE_DIR);
        Some(TransformOutput {
            path_mappings: vec![template, source],
            created_artifacts: Vec::new(),
        })
    }

    fn run_transform(&self, cmd: &Command, artifact: &Artifact) -> Option<TransformOutput> {
        let path = artifact.service_dir().unwrap_or_default();
        let output = match self.env.exec_with_path(cmd, path) {
            Ok(output) => output,
            Err(err) if err.is_not_active() => {
                debug!(
                    target: EXECUTABLE_TARGET,
                    plugin = %self.config.name,
                    error = %err,
                    "skipping transform"
                );
                return None;
            }
            Err(err) => {
                error!(
                    target: EXECUTABLE_TARGET,
                    plugin = %self.config.name,
                    dir = path,
                    error = %err,
                    "transform failed"
                );
                return None;
            }
        };
        if !output.success() {
            debug!(
                target: EXECUTABLE_TARGET,
                plugin = %self.config.name,
                dir = path,
                exit_code = output.exit_code(),
                stdout = output.stdout(),
                stderr = output.stderr(),
                "transform did not succeed"
            );
            return None;
        }
        debug!(
            target: EXECUTABLE_TARGET,
            plugin = %self.config.name,
            argument = %self.env.encode(Path::new(path)),
            "transform succeeded"
        );
        match serde_json::from_str::<TransformOutput>(output.stdout().trim()) {
            Ok(produced) => Some(produced),
            Err(err) => {
                error!(
                    target: EXECUTABLE_TARGET,
                    plugin = %self.config.name,
                    stdout = output.stdout(),
                    error = %err,
                    "unable to parse transform output"
                );
                None
            }
        }
    }
}

impl Transformer for Executable {
    fn config(&self) -> (&TransformerConfig, &Environment) {
        (&self.config, &self.env)
    }

    fn directory_detect(&self, dir: &Path) -> Result<Services, TransformerError> {
        let Some(cmd) = self.exec_config.detect_cmd() else {
            return Ok(Services::new());
        };
        let dir_arg = dir.display().to_string();
        match self.env.exec_with_path(cmd, &dir_arg) {
            Err(err) if err.is_not_active() => {
                debug!(
                    target: EXECUTABLE_TARGET,
                    plugin = %self.config.name,
                    error = %err,
                    "skipping detect"
                );
                Err(TransformerError::EnvironmentNotActive(err))
            }
            Err(err) => {
                error!(
                    target: EXECUTABLE_TARGET,
                    plugin = %self.config.name,
                    dir = %dir_arg,
                    error = %err,
                    "detect failed"
                );
                Ok(Services::new())
            }
            Ok(output) if !output.success() => {
                debug!(
                    target: EXECUTABLE_TARGET,
                    plugin = %self.config.name,
                    dir = %dir_arg,
                    exit_code = output.exit_code(),
                    stdout = output.stdout(),
                    stderr = output.stderr(),
                    "detect did not succeed"
                );
                Ok(Services::new())
            }
            Ok(output) => {
                debug!(
                    target: EXECUTABLE_TARGET,
                    plugin = %self.config.name,
                    argument = %self.env.encode(dir),
                    "detect succeeded"
                );
                Ok(parse_detect_output(output.stdout(), &dir_arg))
            }
        }
    }

    fn transform(&self, new_artifacts: &[Artifact], already_seen: &[Artifact]) -> TransformOutput {
        debug!(
            target: EXECUTABLE_TARGET,
            plugin = %self.config.name,
            new = new_artifacts.len(),
            seen = already_seen.len(),
            "transforming artifacts"
        );
        let mut aggregate = TransformOutput::default();
        for artifact in new_artifacts {
            let produced = match self.exec_config.transform_cmd() {
                Some(cmd) => self.run_transform(cmd, artifact),
                None => self.template_mappings(artifact),
            };
            if let Some(produced) = produced {
                aggregate.append(produced);
            }
        }
        aggregate
    }
}

/// Destination of a service's rendered templates inside the output tree.
fn output_source_path(relative: &Path) -> String {
    if relative.as_os_str().is_empty() {
        return DEFAULT_SOURCE_DIR.to_owned();
    }
    Path::new(DEFAULT_SOURCE_DIR).join(relative).display().to_string()
}
