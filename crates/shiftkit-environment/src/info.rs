//! Static description of where a plugin lives and what it works on.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Host-side facts an environment is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentInfo {
    /// Plugin name, used in diagnostics.
    pub name: String,
    /// Root of the source tree being migrated.
    pub source: PathBuf,
    /// Directory the plugin was loaded from.
    pub context: PathBuf,
    /// Template directory, relative to `context`.
    #[serde(default)]
    pub rel_templates_dir: PathBuf,
}

impl EnvironmentInfo {
    /// Creates a description with no templates directory.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source: impl Into<PathBuf>,
        context: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            context: context.into(),
            rel_templates_dir: PathBuf::new(),
        }
    }

    /// Sets the templates directory relative to the plugin directory.
    #[must_use]
    pub fn with_templates_dir(mut self, rel_templates_dir: impl Into<PathBuf>) -> Self {
        self.rel_templates_dir = rel_templates_dir.into();
        self
    }

    /// Absolute host path of the plugin's templates.
    #[must_use]
    pub fn templates_dir(&self) -> PathBuf {
        if self.rel_templates_dir.as_os_str().is_empty() {
            return self.context.clone();
        }
        self.context.join(&self.rel_templates_dir)
    }

    /// Returns the host source root.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Returns the plugin directory.
    #[must_use]
    pub fn context(&self) -> &Path {
        &self.context
    }
}
