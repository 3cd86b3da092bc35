//! Errors surfaced by executable transformers.

use std::sync::Arc;

use shiftkit_environment::EnvironmentError;
use thiserror::Error;

/// Errors from plugin initialisation and detection.
///
/// Transformation never fails as a whole, so only
/// [`TransformerError::EnvironmentNotActive`] escapes after `init`.
#[derive(Debug, Clone, Error)]
pub enum TransformerError {
    /// The plugin configuration does not have the expected shape.
    #[error("invalid configuration for transformer '{name}': {source}")]
    InvalidConfig {
        /// Transformer name.
        name: String,
        /// Decoding error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// Neither the host nor a container can run the plugin.
    #[error("platform '{platform}' not supported by transformer '{name}': {reason}")]
    UnsupportedPlatform {
        /// Transformer name.
        name: String,
        /// Host platform.
        platform: String,
        /// Why no container could be used instead.
        reason: String,
    },

    /// The execution environment could not be created.
    #[error("failed to create environment for transformer '{name}': {source}")]
    Environment {
        /// Transformer name.
        name: String,
        /// Underlying environment error.
        #[source]
        source: EnvironmentError,
    },

    /// The environment could not be torn down.
    #[error("failed to tear down environment for transformer '{name}': {source}")]
    Teardown {
        /// Transformer name.
        name: String,
        /// Underlying environment error.
        #[source]
        source: EnvironmentError,
    },

    /// The plugin's environment is gone; the caller may skip, retry or
    /// deactivate the plugin.
    #[error(transparent)]
    EnvironmentNotActive(EnvironmentError),
}

impl TransformerError {
    /// Returns `true` for [`TransformerError::EnvironmentNotActive`].
    #[must_use]
    pub const fn is_environment_not_active(&self) -> bool {
        matches!(self, Self::EnvironmentNotActive(_))
    }
}
