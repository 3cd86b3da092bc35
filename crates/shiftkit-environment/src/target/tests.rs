//! Unit tests for host and container execution targets.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mockall::mock;
use rstest::rstest;
use shiftkit_container::{ContainerEngine, EngineError, FileInfo, ImageMetadata};

use super::host::resolve_program;
use super::*;
use crate::descriptor::ContainerDescriptor;
use crate::info::EnvironmentInfo;

mock! {
    Engine {}
    impl ContainerEngine for Engine {
        fn inspect_image(&self, image: &str) -> Result<ImageMetadata, EngineError>;
        fn build_image(&self, image: &str, context: &Path, dockerfile: &Path) -> Result<(), EngineError>;
        fn remove_image(&self, image: &str) -> Result<(), EngineError>;
        fn copy_dirs_into_image(&self, image: &str, new_image: &str, pairs: &[CopyPair]) -> Result<(), EngineError>;
        fn copy_dirs_into_container(&self, container_id: &str, pairs: &[CopyPair]) -> Result<(), EngineError>;
        fn copy_dirs_from_container(&self, container_id: &str, pairs: &[CopyPair]) -> Result<(), EngineError>;
        fn create_container(&self, image: &str) -> Result<String, EngineError>;
        fn stop_and_remove_container(&self, container_id: &str) -> Result<(), EngineError>;
        fn run_cmd_in_container(&self, image: &str, cmd: &Command, options: &ExecOptions) -> Result<ExecOutput, EngineError>;
        fn exec_in_container(&self, container_id: &str, cmd: &Command, options: &ExecOptions) -> Result<ExecOutput, EngineError>;
        fn run_container(&self, image: &str, cmd: &Command, vol_src: &Path, vol_dest: &str) -> Result<String, EngineError>;
        fn stat(&self, container_id: &str, path: &str) -> Result<FileInfo, EngineError>;
    }
}

fn info() -> EnvironmentInfo {
    EnvironmentInfo::new("detector", "/home/dev/app", "/plugins/detector")
}

/// Engine that starts container `c1` from an existing image.
fn running_engine() -> MockEngine {
    let mut engine = MockEngine::new();
    engine
        .expect_inspect_image()
        .returning(|_| Ok(ImageMetadata::default()));
    engine
        .expect_create_container()
        .returning(|_| Ok(String::from("c1")));
    engine
        .expect_copy_dirs_into_container()
        .returning(|_, _| Ok(()));
    engine
}

#[test]
fn start_builds_missing_image_and_populates_container() {
    let mut engine = MockEngine::new();
    engine.expect_inspect_image().times(1).returning(|image| {
        Err(EngineError::ImageNotFound {
            image: image.to_owned(),
        })
    });
    engine
        .expect_build_image()
        .withf(|image, context, dockerfile| {
            image == "example/detector"
                && context == Path::new("/plugins/detector/docker")
                && dockerfile == Path::new("Dockerfile")
        })
        .times(1)
        .returning(|_, _, _| Ok(()));
    engine
        .expect_create_container()
        .times(1)
        .returning(|_| Ok(String::from("c1")));
    engine
        .expect_copy_dirs_into_container()
        .withf(|id, pairs| {
            id == "c1"
                && pairs
                    == [
                        CopyPair::new("/home/dev/app", "/workspace/source"),
                        CopyPair::new("/plugins/detector", "/workspace/context"),
                    ]
        })
        .times(1)
        .returning(|_, _| Ok(()));
    engine
        .expect_stop_and_remove_container()
        .withf(|id| id == "c1")
        .times(1)
        .returning(|_| Ok(()));

    let descriptor =
        ContainerDescriptor::new("example/detector").with_build("docker", "Dockerfile");
    let target = ContainerTarget::start(Arc::new(engine), &descriptor, &info()).expect("start");
    assert_eq!(target.container_id(), Some("c1"));
    assert_eq!(target.image(), "example/detector");
}

#[test]
fn missing_image_without_build_fails_before_creating() {
    let mut engine = MockEngine::new();
    engine.expect_inspect_image().returning(|image| {
        Err(EngineError::ImageNotFound {
            image: image.to_owned(),
        })
    });
    engine.expect_create_container().never();
    let error = ContainerTarget::start(
        Arc::new(engine),
        &ContainerDescriptor::new("example/detector"),
        &info(),
    )
    .expect_err("no image");
    assert!(matches!(error, EnvironmentError::ContainerSetup { .. }));
}

#[test]
fn failed_population_removes_the_container() {
    let mut engine = MockEngine::new();
    engine
        .expect_inspect_image()
        .returning(|_| Ok(ImageMetadata::default()));
    engine
        .expect_create_container()
        .returning(|_| Ok(String::from("c1")));
    engine.expect_copy_dirs_into_container().returning(|_, _| {
        Err(EngineError::CopyFailed {
            src: "/plugins/detector".into(),
            dest: "c1:/workspace/context".into(),
            message: "disk full".into(),
        })
    });
    engine
        .expect_stop_and_remove_container()
        .times(1)
        .returning(|_| Ok(()));
    let error = ContainerTarget::start(
        Arc::new(engine),
        &ContainerDescriptor::new("example/detector"),
        &info(),
    )
    .expect_err("copy fails");
    match error {
        EnvironmentError::ContainerSetup { source, .. } => {
            assert!(matches!(source, EngineError::CopyFailed { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
#[case::default_workdir(None, "/workspace/context")]
#[case::descriptor_workdir(Some("/app"), "/app")]
fn container_exec_uses_descriptor_workdir(
    #[case] working_dir: Option<&'static str>,
    #[case] expected: &'static str,
) {
    let mut engine = running_engine();
    engine
        .expect_exec_in_container()
        .withf(move |id, cmd, options| {
            id == "c1" && cmd.tokens() == ["./detect.sh"] && options.workdir() == Some(expected)
        })
        .times(1)
        .returning(|_, _, _| Ok(ExecOutput::new("{}", "", 0)));
    engine
        .expect_stop_and_remove_container()
        .returning(|_| Ok(()));
    let mut descriptor = ContainerDescriptor::new("example/detector");
    descriptor.working_dir = working_dir.map(str::to_owned);
    let target = ContainerTarget::start(Arc::new(engine), &descriptor, &info()).expect("start");
    let output = target
        .exec(&Command::new(["./detect.sh"]), &ExecOptions::new())
        .expect("exec");
    assert_eq!(output.stdout(), "{}");
}

#[test]
fn vanished_container_is_not_active() {
    let mut engine = running_engine();
    engine.expect_exec_in_container().returning(|id, _, _| {
        Err(EngineError::ContainerNotFound {
            container: id.to_owned(),
        })
    });
    engine
        .expect_stop_and_remove_container()
        .returning(|_| Ok(()));
    let target = ContainerTarget::start(
        Arc::new(engine),
        &ContainerDescriptor::new("example/detector"),
        &info(),
    )
    .expect("start");
    let error = target
        .exec(&Command::new(["true"]), &ExecOptions::new())
        .expect_err("gone");
    assert!(error.is_not_active());
}

#[test]
fn teardown_runs_once_and_deactivates() {
    let mut engine = running_engine();
    engine.expect_exec_in_container().never();
    engine
        .expect_stop_and_remove_container()
        .times(1)
        .returning(|_| Ok(()));
    let mut target = ContainerTarget::start(
        Arc::new(engine),
        &ContainerDescriptor::new("example/detector"),
        &info(),
    )
    .expect("start");
    target.teardown().expect("teardown");
    target.teardown().expect("second teardown");
    assert_eq!(target.container_id(), None);

    let error = target
        .exec(&Command::new(["true"]), &ExecOptions::new())
        .expect_err("removed");
    assert!(error.is_not_active());
    let error = target.copy_out(&[]).expect_err("removed");
    assert!(error.is_not_active());
    drop(target);
}

#[test]
fn empty_container_command_is_rejected() {
    let mut engine = running_engine();
    engine
        .expect_stop_and_remove_container()
        .returning(|_| Ok(()));
    let target = ContainerTarget::start(
        Arc::new(engine),
        &ContainerDescriptor::new("example/detector"),
        &info(),
    )
    .expect("start");
    let error = target
        .exec(&Command::new(Vec::<String>::new()), &ExecOptions::new())
        .expect_err("empty");
    assert!(matches!(error, EnvironmentError::EmptyCommand));
}

#[rstest]
#[case::dot_slash("./detect.sh", "/plugins/detector/detect.sh")]
#[case::nested("bin/detect", "/plugins/detector/bin/detect")]
#[case::bare("python3", "python3")]
#[case::absolute("/usr/bin/env", "/usr/bin/env")]
fn relative_programs_resolve_against_workdir(#[case] program: &str, #[case] expected: &str) {
    assert_eq!(
        resolve_program(program, Path::new("/plugins/detector")),
        PathBuf::from(expected)
    );
}

#[test]
fn host_rejects_empty_command() {
    let target = HostTarget::new("/", None);
    let error = target
        .exec(&Command::new(Vec::<String>::new()), &ExecOptions::new())
        .expect_err("empty");
    assert!(matches!(error, EnvironmentError::EmptyCommand));
}

#[test]
fn host_reports_missing_program() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = HostTarget::new(dir.path(), None);
    let error = target
        .exec(
            &Command::new(["shiftkit-definitely-not-a-program"]),
            &ExecOptions::new(),
        )
        .expect_err("missing");
    assert!(matches!(error, EnvironmentError::Process(_)));
}

#[cfg(unix)]
mod unix {
    use std::fs;

    use super::*;

    #[test]
    fn host_runs_from_workdir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = HostTarget::new(dir.path(), None);
        let output = target
            .exec(&Command::new(["sh", "-c", "pwd"]), &ExecOptions::new())
            .expect("exec");
        let expected = fs::canonicalize(dir.path()).expect("canonicalize");
        assert_eq!(output.stdout().trim(), expected.display().to_string());
        assert!(!target.is_container());
    }

    #[test]
    fn host_exports_environment() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = HostTarget::new(dir.path(), None);
        let output = target
            .exec(
                &Command::new(["sh", "-c", "printf %s \"$SHIFTKIT_QA_RPC_ADDR\""]),
                &ExecOptions::new().with_env("SHIFTKIT_QA_RPC_ADDR", "127.0.0.1:7000"),
            )
            .expect("exec");
        assert_eq!(output.stdout(), "127.0.0.1:7000");
    }

    #[test]
    fn host_non_zero_exit_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = HostTarget::new(dir.path(), None);
        let output = target
            .exec(
                &Command::new(["sh", "-c", "echo nope >&2; exit 3"]),
                &ExecOptions::new(),
            )
            .expect("exec");
        assert_eq!(output.exit_code(), 3);
        assert_eq!(output.stderr().trim(), "nope");
    }

    #[test]
    fn host_timeout_kills_command() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = HostTarget::new(dir.path(), Some(Duration::from_millis(100)));
        let error = target
            .exec(&Command::new(["sh", "-c", "sleep 5"]), &ExecOptions::new())
            .expect_err("timeout");
        assert!(matches!(error, EnvironmentError::Timeout { .. }));
    }
}
