//! Translation between host paths and the paths an execution target sees.
//!
//! A translator holds an ordered list of roots. Encoding rewrites a host path
//! that lies under a host root to the matching target root; decoding goes the
//! other way. Paths outside every root pass through unchanged, which makes
//! the empty translator the identity used for host execution.

use std::path::{Component, Path, PathBuf};

/// A host directory and the location it is mounted at inside a target.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MountedRoot {
    host: PathBuf,
    target: String,
}

/// Maps host paths to target paths and back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTranslator {
    roots: Vec<MountedRoot>,
}

impl PathTranslator {
    /// Returns the identity translator.
    #[must_use]
    pub const fn identity() -> Self {
        Self { roots: Vec::new() }
    }

    /// Adds a root. Earlier roots win when roots overlap.
    #[must_use]
    pub fn with_root(mut self, host: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        let mount: String = target.into();
        let trimmed = mount.trim_end_matches('/');
        self.roots.push(MountedRoot {
            host: host.into(),
            target: if trimmed.is_empty() { String::from("/") } else { trimmed.to_owned() },
        });
        self
    }

    /// Returns `true` when no roots are mapped.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.roots.is_empty()
    }

    /// Converts a host path to the target's view.
    #[must_use]
    pub fn encode(&self, host_path: &Path) -> String {
        for root in &self.roots {
            if let Ok(rest) = host_path.strip_prefix(&root.host) {
                return join_target(&root.target, rest);
            }
        }
        host_path.display().to_string()
    }

    /// Converts a target path back to the host path it came from.
    ///
    /// Intended for diagnostics; paths outside every root are returned as
    /// given.
    #[must_use]
    pub fn decode(&self, target_path: &str) -> PathBuf {
        for root in &self.roots {
            if let Some(rest) = strip_target_prefix(target_path, &root.target) {
                return if rest.is_empty() {
                    root.host.clone()
                } else {
                    root.host.join(rest)
                };
            }
        }
        PathBuf::from(target_path)
    }
}

fn join_target(target_root: &str, rest: &Path) -> String {
    let mut joined = String::from(target_root);
    for component in rest.components() {
        if let Component::Normal(part) = component {
            if !joined.ends_with('/') {
                joined.push('/');
            }
            joined.push_str(&part.to_string_lossy());
        }
    }
    joined
}

fn strip_target_prefix<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    if root == "/" {
        return path.strip_prefix('/');
    }
    let rest = path.strip_prefix(root)?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.strip_prefix('/')
}
