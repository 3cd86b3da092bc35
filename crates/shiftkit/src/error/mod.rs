//! Startup failures.

use std::sync::Arc;

use ortho_config::OrthoError;
use shiftkit_container::EngineError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

/// Errors that stop the process before any plugin is loaded.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Logging could not be installed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Containers were allowed but no usable engine was found.
    #[error("container engine selection failed: {source}")]
    ContainerEngine {
        /// Discovery failure.
        #[source]
        source: EngineError,
    },
}
