//! Configuration loading seam.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use shiftkit_config::Config;

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the process configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader reading defaults, configuration files and `SHIFTKIT_*` variables.
///
/// The host process owns its command line, so no flags are consulted.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([OsString::from("shiftkit")])
    }
}
