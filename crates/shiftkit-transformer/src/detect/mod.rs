//! Interpreting detect command output.
//!
//! Output is tried against the full `service -> [artifact]` shape first,
//! where `null` stands for an empty map, list or artifact. Anything else
//! becomes one unnamed service whose template configuration is the JSON
//! object the plugin printed.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{Artifact, Services, TEMPLATE_CONFIG_TYPE};

/// Tracing target for detect parsing.
const DETECT_TARGET: &str = "shiftkit_transformer::detect";

/// Full detect shape with every level allowed to be `null`.
type RawServices = Option<BTreeMap<String, Option<Vec<Option<Artifact>>>>>;

/// Parses detect output for `dir` and fills in missing service directories.
pub(crate) fn parse_detect_output(stdout: &str, dir: &str) -> Services {
    let trimmed = stdout.trim();
    let mut services = match serde_json::from_str::<RawServices>(trimmed) {
        Ok(raw) => normalise(raw),
        Err(err) => {
            debug!(
                target: DETECT_TARGET,
                error = %err,
                "output is not a service map, treating it as template configuration"
            );
            fallback_services(trimmed, dir)
        }
    };
    fill_default_paths(&mut services, dir);
    services
}

fn normalise(raw: RawServices) -> Services {
    raw.unwrap_or_default()
        .into_iter()
        .map(|(service, listed)| {
            let artifacts = listed
                .unwrap_or_default()
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect();
            (service, artifacts)
        })
        .collect()
}

/// Gives every artifact without paths the service directory `dir`.
pub(crate) fn fill_default_paths(services: &mut Services, dir: &str) {
    for artifact in services.values_mut().flatten() {
        if artifact.paths.is_empty() {
            artifact.set_service_dir(dir);
        }
    }
}

fn fallback_services(trimmed: &str, dir: &str) -> Services {
    let config = if trimmed.is_empty() {
        Value::Null
    } else {
        match serde_json::from_str::<Map<String, Value>>(trimmed) {
            Ok(object) => Value::Object(object),
            Err(err) => {
                debug!(target: DETECT_TARGET, error = %err, "output is not a JSON object");
                Value::Object(Map::new())
            }
        }
    };
    let artifact = Artifact::for_service_dir(dir).with_config(TEMPLATE_CONFIG_TYPE, config);
    Services::from([(String::new(), vec![artifact])])
}
