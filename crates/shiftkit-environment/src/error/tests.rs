//! Unit tests for environment errors.

use std::io;
use std::sync::Arc;

use rstest::rstest;

use super::*;

#[rstest]
#[case::missing(EngineError::ContainerNotFound { container: "c1".into() })]
#[case::stopped(EngineError::ContainerNotRunning { container: "c1".into() })]
fn vanished_containers_become_not_active(#[case] error: EngineError) {
    let mapped = EnvironmentError::from_engine("detector", error);
    assert!(mapped.is_not_active());
    assert!(mapped.to_string().contains("detector"));
}

#[test]
fn engine_timeouts_surface_as_timeouts() {
    let mapped = EnvironmentError::from_engine(
        "detector",
        EngineError::Process(ProcessError::Timeout {
            program: "docker".into(),
            timeout_secs: 3,
        }),
    );
    assert!(matches!(
        mapped,
        EnvironmentError::Timeout { timeout_secs: 3, .. }
    ));
}

#[test]
fn other_engine_failures_are_kept() {
    let mapped = EnvironmentError::from_engine(
        "detector",
        EngineError::Runtime {
            operation: "exec",
            message: "daemon hiccup".into(),
        },
    );
    assert!(!mapped.is_not_active());
    assert!(matches!(mapped, EnvironmentError::Engine(_)));
}

#[test]
fn spawn_failures_stay_process_errors() {
    let error = EnvironmentError::from(ProcessError::Spawn {
        program: "./detect.sh".into(),
        source: Arc::new(io::Error::from(io::ErrorKind::NotFound)),
    });
    assert!(matches!(error, EnvironmentError::Process(_)));
    assert!(error.to_string().contains("./detect.sh"));
}
