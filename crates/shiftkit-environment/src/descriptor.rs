//! Declarative description of a plugin's container.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where commands run inside the container unless the descriptor overrides
/// it.
pub const DEFAULT_CONTAINER_WORKDIR: &str = "/workspace/context";

/// Mount point of the host source root inside containers.
pub const CONTAINER_SOURCE_ROOT: &str = "/workspace/source";

/// Mount point of the plugin directory inside containers.
pub const CONTAINER_CONTEXT_ROOT: &str = "/workspace/context";

/// How to build an image that is not available locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildSpec {
    /// Build context, relative to the plugin directory.
    pub context: PathBuf,
    /// Dockerfile, relative to the build context.
    pub dockerfile: PathBuf,
}

/// Container a plugin asks to run in.
///
/// An empty `image` means the plugin declares no container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerDescriptor {
    /// Image reference.
    pub image: String,
    /// Build instructions used when the image is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,
    /// Working directory for commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

impl ContainerDescriptor {
    /// Creates a descriptor for `image`.
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    /// Adds build instructions.
    #[must_use]
    pub fn with_build(
        mut self,
        context: impl Into<PathBuf>,
        dockerfile: impl Into<PathBuf>,
    ) -> Self {
        self.build = Some(BuildSpec {
            context: context.into(),
            dockerfile: dockerfile.into(),
        });
        self
    }

    /// Returns `true` when an image is declared.
    #[must_use]
    pub fn is_declared(&self) -> bool {
        !self.image.trim().is_empty()
    }

    /// Working directory for commands inside the container.
    #[must_use]
    pub fn workdir(&self) -> &str {
        self.working_dir
            .as_deref()
            .filter(|dir| !dir.is_empty())
            .unwrap_or(DEFAULT_CONTAINER_WORKDIR)
    }
}
