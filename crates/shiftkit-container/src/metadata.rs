//! Data returned by image inspection and in-container `stat`.

use serde::{Deserialize, Serialize};

/// Subset of an image inspection record used by the substrate.
///
/// Field names follow the runtime's `image inspect` JSON so the record can
/// be deserialised directly; `null` lists are tolerated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageMetadata {
    /// Content-addressed image ID.
    #[serde(default)]
    pub id: String,
    /// Tags pointing at the image.
    #[serde(default)]
    pub repo_tags: Option<Vec<String>>,
    /// Creation timestamp as reported by the runtime.
    #[serde(default)]
    pub created: Option<String>,
    /// CPU architecture.
    #[serde(default)]
    pub architecture: Option<String>,
    /// Operating system.
    #[serde(default)]
    pub os: Option<String>,
    /// Default run configuration.
    #[serde(default)]
    pub config: Option<ImageConfig>,
}

/// Default run configuration baked into an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageConfig {
    /// Default working directory.
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Default environment as `KEY=VALUE` entries.
    #[serde(default)]
    pub env: Option<Vec<String>>,
    /// Entrypoint tokens.
    #[serde(default)]
    pub entrypoint: Option<Vec<String>>,
    /// Default command tokens.
    #[serde(default)]
    pub cmd: Option<Vec<String>>,
}

impl ImageMetadata {
    /// Returns the image tags, empty when the runtime reported none.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        self.repo_tags.as_deref().unwrap_or_default()
    }

    /// Returns the entrypoint tokens, empty when unset.
    #[must_use]
    pub fn entrypoint(&self) -> &[String] {
        self.config
            .as_ref()
            .and_then(|config| config.entrypoint.as_deref())
            .unwrap_or_default()
    }

    /// Returns the default command tokens, empty when unset.
    #[must_use]
    pub fn cmd(&self) -> &[String] {
        self.config
            .as_ref()
            .and_then(|config| config.cmd.as_deref())
            .unwrap_or_default()
    }

    /// Returns the default working directory, if any.
    #[must_use]
    pub fn working_dir(&self) -> Option<&str> {
        self.config
            .as_ref()
            .and_then(|config| config.working_dir.as_deref())
            .filter(|dir| !dir.is_empty())
    }
}

/// Kind of filesystem entry reported by [`FileInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Regular file (empty or not).
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Anything else (sockets, devices, fifos).
    Other,
}

impl FileKind {
    /// Maps the `%F` descriptor printed by `stat` to a kind.
    #[must_use]
    pub fn from_stat_descriptor(descriptor: &str) -> Self {
        match descriptor {
            "regular file" | "regular empty file" => Self::File,
            "directory" => Self::Directory,
            "symbolic link" => Self::Symlink,
            _ => Self::Other,
        }
    }
}

/// Metadata for one path inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Path as reported by `stat`.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Entry kind.
    pub kind: FileKind,
    /// Permission bits.
    pub mode: u32,
    /// Modification time, seconds since the Unix epoch.
    pub modified: u64,
}

impl FileInfo {
    /// Returns `true` when the entry is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}
