//! Command-line transformer plugins.
//!
//! A plugin declares optional detect and transform commands in its
//! [`ExecutableConfig`]. [`Executable`] runs them inside the plugin's
//! [`Environment`](shiftkit_environment::Environment), appending the
//! directory or artifact path as the last argument, and turns their JSON
//! output into [`Services`] and [`TransformOutput`].

mod config;
mod detect;
mod error;
mod executable;
mod qa;
mod types;

pub use config::{ExecutableConfig, TransformerConfig};
pub use error::TransformerError;
pub use executable::{Executable, ExecutableLoader, Transformer};
pub use qa::{QaReceiver, QaStartError};
pub use types::{
    Artifact, DEFAULT_SOURCE_DIR, PathMapping, PathMappingType, SERVICE_DIR_PATH_TYPE, Services,
    TEMPLATE_CONFIG_TYPE, TransformOutput,
};

#[cfg(test)]
mod tests;
