//! Wire types exchanged with detect and transform commands.
//!
//! All maps are ordered so serialised output is stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Path role holding the directories a service lives in.
pub const SERVICE_DIR_PATH_TYPE: &str = "ServiceDirectories";

/// Config type carrying an opaque template configuration.
pub const TEMPLATE_CONFIG_TYPE: &str = "TemplateConfig";

/// Output directory that source trees are copied into.
pub const DEFAULT_SOURCE_DIR: &str = "source";

/// Detected services keyed by service name. The empty name marks a service
/// the plugin did not name.
pub type Services = BTreeMap<String, Vec<Artifact>>;

/// The unit of data passed from detection to transformation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Artifact {
    /// Optional artifact name.
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub name: String,
    /// Optional artifact type.
    #[serde(
        rename = "type",
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub artifact_type: String,
    /// Paths grouped by role.
    #[serde(deserialize_with = "nullable_paths")]
    pub paths: BTreeMap<String, Vec<String>>,
    /// Opaque configuration grouped by config type.
    #[serde(deserialize_with = "null_as_default")]
    pub configs: BTreeMap<String, Value>,
}

impl Artifact {
    /// Creates an artifact whose only path is the service directory `dir`.
    #[must_use]
    pub fn for_service_dir(dir: impl Into<String>) -> Self {
        let mut artifact = Self::default();
        artifact.set_service_dir(dir);
        artifact
    }

    /// Replaces the paths with a single service directory.
    pub fn set_service_dir(&mut self, dir: impl Into<String>) {
        self.paths = BTreeMap::from([(SERVICE_DIR_PATH_TYPE.to_owned(), vec![dir.into()])]);
    }

    /// Attaches a configuration value under `config_type`.
    #[must_use]
    pub fn with_config(mut self, config_type: impl Into<String>, config: Value) -> Self {
        self.configs.insert(config_type.into(), config);
        self
    }

    /// Returns the primary service directory, if any.
    #[must_use]
    pub fn service_dir(&self) -> Option<&str> {
        self.paths
            .get(SERVICE_DIR_PATH_TYPE)
            .and_then(|dirs| dirs.first())
            .map(String::as_str)
    }

    /// Returns the template configuration, if any.
    #[must_use]
    pub fn template_config(&self) -> Option<&Value> {
        self.configs.get(TEMPLATE_CONFIG_TYPE)
    }
}

/// How a path mapping is materialised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathMappingType {
    /// Copy files, letting the driver choose merge semantics.
    #[default]
    #[serde(alias = "Default")]
    Default,
    /// Render a template directory.
    #[serde(alias = "Template")]
    Template,
    /// Copy a source tree.
    #[serde(alias = "Source")]
    Source,
    /// Apply the difference between source trees.
    #[serde(alias = "SourceDiff")]
    SourceDiff,
    /// Render the destination path itself as a template.
    #[serde(alias = "PathTemplate")]
    PathTemplate,
    /// Delete the destination.
    #[serde(alias = "Delete")]
    Delete,
}

/// Instruction describing how a source path is materialised at a
/// destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathMapping {
    /// Materialisation kind.
    #[serde(rename = "type")]
    pub mapping_type: PathMappingType,
    /// Source path. Empty means the artifact's own source tree.
    #[serde(deserialize_with = "null_as_default")]
    pub src_path: String,
    /// Destination path.
    #[serde(deserialize_with = "null_as_default")]
    pub dest_path: String,
    /// Configuration used when rendering templates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_config: Option<Value>,
}

impl PathMapping {
    /// Creates a mapping without template configuration.
    #[must_use]
    pub fn new(
        mapping_type: PathMappingType,
        src_path: impl Into<String>,
        dest_path: impl Into<String>,
    ) -> Self {
        Self {
            mapping_type,
            src_path: src_path.into(),
            dest_path: dest_path.into(),
            template_config: None,
        }
    }

    /// Attaches template configuration.
    #[must_use]
    pub fn with_template_config(mut self, config: Option<Value>) -> Self {
        self.template_config = config;
        self
    }
}

/// Everything a transform produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOutput {
    /// Path mappings to apply.
    #[serde(deserialize_with = "null_as_default")]
    pub path_mappings: Vec<PathMapping>,
    /// Artifacts created for later transformers.
    #[serde(deserialize_with = "null_as_default")]
    pub created_artifacts: Vec<Artifact>,
}

impl TransformOutput {
    /// Appends another output without merging or deduplicating.
    pub fn append(&mut self, mut other: Self) {
        self.path_mappings.append(&mut other.path_mappings);
        self.created_artifacts.append(&mut other.created_artifacts);
    }

    /// Returns `true` when nothing was produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path_mappings.is_empty() && self.created_artifacts.is_empty()
    }
}

/// Reads `null` as the type's default, the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn nullable_paths<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<Vec<String>>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(role, paths)| (role, paths.unwrap_or_default()))
        .collect())
}
