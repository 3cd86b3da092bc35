//! Plugin configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shiftkit_container::Command;
use shiftkit_environment::ContainerDescriptor;

/// The part of an external transformer definition the executable needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    /// Transformer name.
    pub name: String,
    /// Plugin-specific configuration, decoded into [`ExecutableConfig`].
    pub config: Value,
}

impl TransformerConfig {
    /// Creates a definition.
    #[must_use]
    pub fn new(name: impl Into<String>, config: Value) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

/// Declared behaviour of a command-line plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutableConfig {
    /// Whether the plugin asks questions through the QA service.
    #[serde(rename = "enableQA", alias = "enableQa")]
    pub enable_qa: bool,
    /// Host platforms the commands run on natively.
    pub platforms: Vec<String>,
    /// Command run once per directory during detection.
    #[serde(
        rename = "directoryDetectCMD",
        alias = "directoryDetectCmd",
        skip_serializing_if = "Option::is_none"
    )]
    pub directory_detect_cmd: Option<Command>,
    /// Command run once per artifact during transformation.
    #[serde(
        rename = "transformCMD",
        alias = "transformCmd",
        skip_serializing_if = "Option::is_none"
    )]
    pub transform_cmd: Option<Command>,
    /// Container the commands may run in.
    pub container: ContainerDescriptor,
}

impl ExecutableConfig {
    /// Decodes the configuration. `null` yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns the decoding error when `value` does not have the expected
    /// shape.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(value)
    }

    /// Returns the detect command, treating an empty one as absent.
    #[must_use]
    pub fn detect_cmd(&self) -> Option<&Command> {
        self.directory_detect_cmd.as_ref().filter(|cmd| !cmd.is_empty())
    }

    /// Returns the transform command, treating an empty one as absent.
    #[must_use]
    pub fn transform_cmd(&self) -> Option<&Command> {
        self.transform_cmd.as_ref().filter(|cmd| !cmd.is_empty())
    }

    /// Returns `true` when the commands can run natively on `platform`.
    ///
    /// `darwin` and `macos` name the same platform.
    #[must_use]
    pub fn supports_platform(&self, platform: &str) -> bool {
        let wanted = canonical_platform(platform);
        self.platforms
            .iter()
            .any(|declared| canonical_platform(declared) == wanted)
    }

    /// Returns `true` when a container image is declared.
    #[must_use]
    pub fn has_container(&self) -> bool {
        self.container.is_declared()
    }
}

fn canonical_platform(platform: &str) -> String {
    let lower = platform.trim().to_ascii_lowercase();
    if lower == "darwin" {
        String::from("macos")
    } else {
        lower
    }
}
