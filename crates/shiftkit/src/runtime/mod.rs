//! Process startup and plugin loading.

use std::sync::Arc;
use std::time::Duration;

use shiftkit_config::{Config, RuntimePreference};
use shiftkit_container::{CliEngine, ConsentGate, ContainerEngine, ContainerSupport, EngineError};
use shiftkit_environment::EnvironmentInfo;
use shiftkit_transformer::{
    Executable, ExecutableLoader, QaReceiver, TransformerConfig, TransformerError,
};
use tracing::{error, info};

use crate::config::ConfigLoader;
use crate::error::BootstrapError;
use crate::telemetry;

const RUNTIME_TARGET: &str = "shiftkit::runtime";

/// Process-wide services shared by every plugin.
#[derive(Debug)]
pub struct Runtime {
    config: Config,
    containers: ContainerSupport,
}

impl Runtime {
    /// Loads configuration through `loader` and starts the runtime.
    ///
    /// # Errors
    ///
    /// See [`Runtime::start`]; additionally fails with
    /// [`BootstrapError::Configuration`] when loading fails.
    pub fn load(
        loader: &dyn ConfigLoader,
        consent: &dyn ConsentGate,
    ) -> Result<Self, BootstrapError> {
        let config = loader
            .load()
            .map_err(|source| BootstrapError::Configuration { source })?;
        Self::start(config, consent)
    }

    /// Installs logging and selects the container engine.
    ///
    /// `consent` is asked at most once, and only when the configuration
    /// does not already decide.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Telemetry`] when logging cannot be installed
    /// and [`BootstrapError::ContainerEngine`] when containers were allowed
    /// but no runtime is usable.
    pub fn start(config: Config, consent: &dyn ConsentGate) -> Result<Self, BootstrapError> {
        Self::start_with(config, consent, |preference, timeout| {
            let engine = CliEngine::discover(preference, timeout)?;
            Ok(Arc::new(engine) as Arc<dyn ContainerEngine>)
        })
    }

    /// Starts the runtime with a caller-supplied engine discovery.
    ///
    /// # Errors
    ///
    /// As for [`Runtime::start`].
    pub fn start_with<F>(
        config: Config,
        consent: &dyn ConsentGate,
        discover: F,
    ) -> Result<Self, BootstrapError>
    where
        F: FnOnce(
            RuntimePreference,
            Option<Duration>,
        ) -> Result<Arc<dyn ContainerEngine>, EngineError>,
    {
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
        let containers = ContainerSupport::from_config(&config);
        containers
            .initialise_with(consent, discover)
            .map_err(|source| {
                error!(target: RUNTIME_TARGET, error = %source, "no container engine available");
                BootstrapError::ContainerEngine { source }
            })?;
        Ok(Self::announce(config, containers))
    }

    /// Wraps an already initialised container service.
    ///
    /// Logging is left untouched.
    #[must_use]
    pub const fn with_containers(config: Config, containers: ContainerSupport) -> Self {
        Self { config, containers }
    }

    fn announce(config: Config, containers: ContainerSupport) -> Self {
        info!(
            target: RUNTIME_TARGET,
            containers_enabled = !containers.is_disabled(),
            exec_timeout_secs = config.exec_timeout().map(|timeout| timeout.as_secs()),
            "runtime started"
        );
        Self { config, containers }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the container service handed to plugins.
    #[must_use]
    pub const fn containers(&self) -> &ContainerSupport {
        &self.containers
    }

    /// Creates an initialised executable plugin.
    ///
    /// # Errors
    ///
    /// Propagates [`TransformerError`] from plugin initialisation.
    pub fn load_executable(
        &self,
        config: TransformerConfig,
        info: EnvironmentInfo,
        qa: Option<&dyn QaReceiver>,
    ) -> Result<Executable, TransformerError> {
        let base = ExecutableLoader::new(&self.containers)
            .with_exec_timeout(self.config.exec_timeout());
        let loader = match qa {
            Some(receiver) => base.with_qa(receiver),
            None => base,
        };
        Executable::init(config, info, &loader)
    }
}
