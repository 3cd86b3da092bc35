//! Process-scoped container support.
//!
//! [`ContainerSupport`] is built once during startup and handed by reference
//! to every plugin. It resolves the operator's consent and the runtime
//! discovery exactly once; afterwards every reader sees the same answer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use shiftkit_config::{Config, ContainerPolicy, RuntimePreference};
use tracing::{debug, info};

use crate::cli::CliEngine;
use crate::engine::ContainerEngine;
use crate::error::EngineError;

/// Tracing target for engine selection.
const SUPPORT_TARGET: &str = "shiftkit_container::support";

/// Answers whether the operator allows containers to be spawned.
pub trait ConsentGate {
    /// Returns `true` when containers may be used.
    fn allows_containers(&self) -> bool;
}

impl<F> ConsentGate for F
where
    F: Fn() -> bool,
{
    fn allows_containers(&self) -> bool {
        self()
    }
}

#[derive(Clone)]
enum EngineState {
    Disabled,
    Available(Arc<dyn ContainerEngine>),
}

/// Holds the container engine selected for this process, if any.
pub struct ContainerSupport {
    policy: ContainerPolicy,
    exec_timeout: Option<Duration>,
    state: OnceCell<EngineState>,
}

impl fmt::Debug for ContainerSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state.get() {
            None => "uninitialised",
            Some(EngineState::Disabled) => "disabled",
            Some(EngineState::Available(_)) => "available",
        };
        f.debug_struct("ContainerSupport")
            .field("policy", &self.policy)
            .field("exec_timeout", &self.exec_timeout)
            .field("state", &state)
            .finish()
    }
}

impl ContainerSupport {
    /// Creates an uninitialised service for `policy`.
    #[must_use]
    pub const fn new(policy: ContainerPolicy, exec_timeout: Option<Duration>) -> Self {
        Self {
            policy,
            exec_timeout,
            state: OnceCell::new(),
        }
    }

    /// Creates an uninitialised service from process configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.containers(), config.exec_timeout())
    }

    /// Creates a service that already holds `engine`.
    #[must_use]
    pub fn with_engine(engine: Arc<dyn ContainerEngine>) -> Self {
        Self {
            policy: ContainerPolicy::default(),
            exec_timeout: None,
            state: OnceCell::with_value(EngineState::Available(engine)),
        }
    }

    /// Creates a service on which containers are permanently unavailable.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            policy: ContainerPolicy {
                spawn: Some(false),
                runtime: RuntimePreference::Auto,
            },
            exec_timeout: None,
            state: OnceCell::with_value(EngineState::Disabled),
        }
    }

    /// Resolves consent and discovers a runtime on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoRuntime`] when containers were allowed but no
    /// runtime responds.
    pub fn initialise(&self, consent: &dyn ConsentGate) -> Result<(), EngineError> {
        self.initialise_with(consent, |preference, timeout| {
            let engine = CliEngine::discover(preference, timeout)?;
            Ok(Arc::new(engine) as Arc<dyn ContainerEngine>)
        })
    }

    /// Resolves consent and selects an engine through `discover`.
    ///
    /// Once a selection has been made, later calls return immediately without
    /// consulting `consent` or `discover`. A failed discovery leaves the
    /// service uninitialised.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `discover`.
    pub fn initialise_with<F>(
        &self,
        consent: &dyn ConsentGate,
        discover: F,
    ) -> Result<(), EngineError>
    where
        F: FnOnce(
            RuntimePreference,
            Option<Duration>,
        ) -> Result<Arc<dyn ContainerEngine>, EngineError>,
    {
        self.state
            .get_or_try_init(|| {
                let allowed = match self.policy.spawn() {
                    Some(answer) => {
                        debug!(
                            target: SUPPORT_TARGET,
                            allowed = answer,
                            "consent taken from configuration"
                        );
                        answer
                    }
                    None => consent.allows_containers(),
                };
                if !allowed {
                    info!(target: SUPPORT_TARGET, "container support disabled by operator");
                    return Ok(EngineState::Disabled);
                }
                let engine = discover(self.policy.runtime(), self.exec_timeout)?;
                info!(target: SUPPORT_TARGET, "container engine selected");
                Ok(EngineState::Available(engine))
            })
            .map(|_| ())
    }

    /// Returns the selected engine, or `None` when containers are disabled or
    /// selection has not run.
    #[must_use]
    pub fn engine(&self) -> Option<Arc<dyn ContainerEngine>> {
        match self.state.get() {
            Some(EngineState::Available(engine)) => Some(Arc::clone(engine)),
            Some(EngineState::Disabled) | None => None,
        }
    }

    /// Returns the selected engine or why there is none.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Disabled`] when containers were declined and
    /// [`EngineError::NoRuntime`] when selection has not completed.
    pub fn require_engine(&self) -> Result<Arc<dyn ContainerEngine>, EngineError> {
        match self.state.get() {
            Some(EngineState::Available(engine)) => Ok(Arc::clone(engine)),
            Some(EngineState::Disabled) => Err(EngineError::Disabled),
            None => Err(EngineError::NoRuntime { tried: Vec::new() }),
        }
    }

    /// Returns `true` when the operator declined containers.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        matches!(self.state.get(), Some(EngineState::Disabled))
    }

    /// Returns `true` once a selection has been made.
    #[must_use]
    pub fn is_initialised(&self) -> bool {
        self.state.get().is_some()
    }
}
