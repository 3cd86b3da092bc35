//! Behaviour-driven tests for the detect/transform protocol.

use std::fs;
use std::path::PathBuf;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};
use shiftkit_container::ContainerSupport;
use shiftkit_environment::EnvironmentInfo;
use tempfile::TempDir;

use crate::{
    Artifact, Executable, ExecutableLoader, PathMappingType, Services, TransformOutput,
    Transformer, TransformerConfig, TransformerError,
};

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

struct TestWorld {
    source: TempDir,
    context: TempDir,
    plugin: Option<Executable>,
    detected: Option<Result<Services, TransformerError>>,
    transformed: Option<TransformOutput>,
}

#[fixture]
fn world() -> TestWorld {
    TestWorld {
        source: tempfile::tempdir().expect("source dir"),
        context: tempfile::tempdir().expect("context dir"),
        plugin: None,
        detected: None,
        transformed: None,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_script(world: &TestWorld, name: &str, body: &str) {
    fs::write(world.context.path().join(name), body).expect("write script");
}

fn printing(output: &str) -> String {
    format!("cat <<'SHIFTKIT_EOF'\n{output}\nSHIFTKIT_EOF\n")
}

fn load_plugin(world: &mut TestWorld, config: Value) {
    let mut config = config;
    config["platforms"] = json!([std::env::consts::OS]);
    let support = ContainerSupport::disabled();
    let loader = ExecutableLoader::new(&support);
    let info = EnvironmentInfo::new("bdd-plugin", world.source.path(), world.context.path());
    let plugin = Executable::init(TransformerConfig::new("bdd-plugin", config), info, &loader)
        .expect("plugin init");
    world.plugin = Some(plugin);
}

fn plugin(world: &TestWorld) -> &Executable {
    world.plugin.as_ref().expect("no plugin loaded")
}

fn service_path(world: &TestWorld, quoted: &str) -> PathBuf {
    let dir = quoted.trim_matches('"');
    if dir.starts_with('/') {
        PathBuf::from(dir)
    } else {
        world.source.path().join(dir)
    }
}

fn detected(world: &TestWorld) -> &Services {
    world
        .detected
        .as_ref()
        .expect("no detection ran")
        .as_ref()
        .expect("detection failed")
}

fn transformed(world: &TestWorld) -> &TransformOutput {
    world.transformed.as_ref().expect("no transform ran")
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a plugin without commands")]
fn given_plugin_without_commands(world: &mut TestWorld) {
    load_plugin(world, json!({}));
}

#[given("a plugin whose detect command prints {output}")]
fn given_detect_prints(world: &mut TestWorld, output: String) {
    write_script(world, "detect.sh", &printing(output.trim_matches('\'')));
    load_plugin(world, json!({ "directoryDetectCMD": ["sh", "detect.sh"] }));
}

#[given("a plugin whose detect command exits with status {code}")]
fn given_detect_exits(world: &mut TestWorld, code: i32) {
    write_script(world, "detect.sh", &format!("echo '{{}}'\nexit {code}\n"));
    load_plugin(world, json!({ "directoryDetectCMD": ["sh", "detect.sh"] }));
}

#[given("a plugin whose transform command prints {output}")]
fn given_transform_prints(world: &mut TestWorld, output: String) {
    write_script(world, "transform.sh", &printing(output.trim_matches('\'')));
    load_plugin(world, json!({ "transformCMD": ["sh", "transform.sh"] }));
}

#[given("a plugin whose transform command exits with status {code}")]
fn given_transform_exits(world: &mut TestWorld, code: i32) {
    let body = format!(
        "echo '{{\"pathMappings\":[{{\"type\":\"source\",\"destPath\":\"x\"}}]}}'\nexit {code}\n"
    );
    write_script(world, "transform.sh", &body);
    load_plugin(world, json!({ "transformCMD": ["sh", "transform.sh"] }));
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("directory {dir} is detected")]
fn when_detected(world: &mut TestWorld, dir: String) {
    let path = service_path(world, &dir);
    fs::create_dir_all(&path).expect("create directory");
    let result = plugin(world).directory_detect(&path);
    world.detected = Some(result);
}

#[when("artifacts for directories {dirs} are transformed")]
fn when_transformed(world: &mut TestWorld, dirs: String) {
    let artifacts: Vec<Artifact> = dirs
        .trim_matches('"')
        .split(',')
        .map(|dir| Artifact::for_service_dir(service_path(world, dir).display().to_string()))
        .collect();
    let output = plugin(world).transform(&artifacts, &[]);
    world.transformed = Some(output);
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("no services are detected")]
fn then_nothing_detected(world: &mut TestWorld) {
    assert!(detected(world).is_empty(), "{:?}", detected(world));
}

#[then("one unnamed service is detected for directory {dir}")]
fn then_unnamed_service(world: &mut TestWorld, dir: String) {
    let expected = service_path(world, &dir).display().to_string();
    let services = detected(world);
    assert_eq!(services.len(), 1);
    let artifacts = services.get("").expect("unnamed service");
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].service_dir(), Some(expected.as_str()));
}

#[then("its template config is {config}")]
fn then_template_config(world: &mut TestWorld, config: String) {
    let expected: Value =
        serde_json::from_str(config.trim_matches('\'')).expect("expected config is JSON");
    let artifact = &detected(world)[""][0];
    assert_eq!(artifact.template_config(), Some(&expected));
}

#[then("every artifact of service {name} has service directory {dir}")]
fn then_default_paths(world: &mut TestWorld, name: String, dir: String) {
    let expected = vec![service_path(world, &dir).display().to_string()];
    let artifacts = detected(world)
        .get(name.trim_matches('"'))
        .expect("named service");
    assert!(!artifacts.is_empty());
    for artifact in artifacts {
        assert_eq!(artifact.paths.get(crate::SERVICE_DIR_PATH_TYPE), Some(&expected));
    }
}

#[then("{count} path mappings are produced")]
fn then_mapping_count(world: &mut TestWorld, count: usize) {
    assert_eq!(transformed(world).path_mappings.len(), count);
}

#[then("{count} created artifacts are produced")]
fn then_created_count(world: &mut TestWorld, count: usize) {
    assert_eq!(transformed(world).created_artifacts.len(), count);
}

#[then("the only path mapping is a source mapping to {dest}")]
fn then_single_source_mapping(world: &mut TestWorld, dest: String) {
    let mappings = &transformed(world).path_mappings;
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].mapping_type, PathMappingType::Source);
    assert_eq!(mappings[0].src_path, "");
    assert_eq!(mappings[0].dest_path, dest.trim_matches('"'));
    assert_eq!(mappings[0].template_config, None);
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/executable_protocol.feature")]
fn executable_protocol_behaviour(world: TestWorld) {
    let _ = world;
}
