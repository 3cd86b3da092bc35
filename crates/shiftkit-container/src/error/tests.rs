//! Unit tests for engine error types.

use rstest::rstest;

use super::*;

#[rstest]
#[case::image(EngineError::ImageNotFound { image: "alpine".into() }, true)]
#[case::container(EngineError::ContainerNotFound { container: "c1".into() }, true)]
#[case::path(
    EngineError::PathNotFound { container: "c1".into(), path: "/x".into() },
    true
)]
#[case::not_running(EngineError::ContainerNotRunning { container: "c1".into() }, false)]
#[case::disabled(EngineError::Disabled, false)]
fn not_found_family(#[case] error: EngineError, #[case] expected: bool) {
    assert_eq!(error.is_not_found(), expected);
}

#[test]
fn started_flag_separates_launch_from_command_failure() {
    let never = EngineError::ContainerNotStarted {
        image: "alpine".into(),
        message: "pull access denied".into(),
    };
    let failed = EngineError::CommandFailed {
        image: "alpine".into(),
        exit_code: 2,
        output: String::new(),
    };
    assert!(!never.container_started());
    assert!(failed.container_started());
}

#[test]
fn copy_failure_names_the_pair() {
    let error = EngineError::CopyFailed {
        src: "/host/src".into(),
        dest: "c1:/workspace/source".into(),
        message: "permission denied".into(),
    };
    let message = error.to_string();
    assert!(message.contains("/host/src"), "{message}");
    assert!(message.contains("c1:/workspace/source"), "{message}");
}

#[test]
fn no_runtime_lists_candidates() {
    let error = EngineError::NoRuntime {
        tried: vec!["docker".into(), "podman".into()],
    };
    assert!(error.to_string().contains("docker, podman"));
}

#[test]
fn errors_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<EngineError>();
}

#[test]
fn process_io_failures_keep_their_source() {
    let error = EngineError::from(ProcessError::Io {
        program: String::from("docker"),
        source: std::sync::Arc::new(std::io::Error::other("pipe closed")),
    });
    assert!(matches!(error, EngineError::Process(ProcessError::Io { .. })));
    assert!(!error.is_not_found());
    assert_eq!(error.to_string(), "I/O error while running 'docker': pipe closed");
    let source = std::error::Error::source(&error).map(ToString::to_string);
    assert_eq!(source.as_deref(), Some("pipe closed"));
}
