//! Container runtime abstraction for plugin execution.
//!
//! The crate exposes the [`ContainerEngine`] capability, a command-line
//! implementation that drives docker or podman ([`CliEngine`]), and the
//! process-scoped [`ContainerSupport`] service that selects one engine per
//! process after consulting the operator's consent.
//!
//! [`Command`] and [`run_captured`] are shared with host execution so both
//! paths report results as [`ExecOutput`].

mod cli;
mod command;
mod engine;
mod error;
mod metadata;
mod process;
mod support;

pub use cli::{CliEngine, CliRunner, ContainerRuntime, SystemRunner};
pub use command::Command;
pub use engine::{ContainerEngine, CopyPair, EnvVar, ExecOptions};
pub use error::EngineError;
pub use metadata::{FileInfo, FileKind, ImageConfig, ImageMetadata};
pub use process::{ExecOutput, ProcessError, run_captured};
pub use support::{ConsentGate, ContainerSupport};
