//! Startup wiring for the plugin execution substrate.
//!
//! [`Runtime`] installs logging, settles whether containers may be used and
//! which engine drives them, and then loads executable plugins against that
//! shared state. The building blocks are re-exported from their own crates.

mod config;
mod error;
mod runtime;
pub mod telemetry;

pub use config::{ConfigLoader, SystemConfigLoader};
pub use error::BootstrapError;
pub use runtime::Runtime;
pub use shiftkit_config::{Config, ContainerPolicy, LogFormat, RuntimePreference, SpawnPolicy};
pub use shiftkit_container::{ConsentGate, ContainerEngine, ContainerSupport, EngineError};
pub use shiftkit_environment::{Environment, EnvironmentError, EnvironmentInfo};
pub use shiftkit_transformer::{
    Artifact, Executable, QaReceiver, QaStartError, Services, TransformOutput, Transformer,
    TransformerConfig, TransformerError,
};
