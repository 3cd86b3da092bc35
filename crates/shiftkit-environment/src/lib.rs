//! Execution environments for plugins.
//!
//! An [`Environment`] owns exactly one place commands run: the host, or one
//! long-lived container created from the plugin's [`ContainerDescriptor`].
//! It translates host paths into that target's view with a
//! [`PathTranslator`] and reports a vanished target as
//! [`EnvironmentError::NotActive`], separately from commands that ran and
//! failed.

mod descriptor;
mod environment;
mod error;
mod info;
mod paths;
mod target;

pub use descriptor::{
    BuildSpec, CONTAINER_CONTEXT_ROOT, CONTAINER_SOURCE_ROOT, ContainerDescriptor,
    DEFAULT_CONTAINER_WORKDIR,
};
pub use environment::{Environment, QA_RPC_ADDR_ENV};
pub use error::EnvironmentError;
pub use info::EnvironmentInfo;
pub use paths::PathTranslator;
pub use target::{ContainerTarget, ExecTarget, HostTarget};
