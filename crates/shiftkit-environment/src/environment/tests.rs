//! Unit tests for the environment facade.

use std::net::{Ipv4Addr, SocketAddr};

use mockall::mock;
use rstest::{fixture, rstest};

use super::*;

mock! {
    Target {}
    impl ExecTarget for Target {
        fn exec(&self, cmd: &Command, options: &ExecOptions) -> Result<ExecOutput, EnvironmentError>;
        fn copy_out(&self, pairs: &[CopyPair]) -> Result<(), EnvironmentError>;
        fn is_container(&self) -> bool;
        fn teardown(&mut self) -> Result<(), EnvironmentError>;
    }
}

#[fixture]
fn info() -> EnvironmentInfo {
    EnvironmentInfo::new("detector", "/home/dev/app", "/plugins/detector")
        .with_templates_dir("templates")
}

fn container_translator() -> PathTranslator {
    PathTranslator::identity()
        .with_root("/home/dev/app", CONTAINER_SOURCE_ROOT)
        .with_root("/plugins/detector", CONTAINER_CONTEXT_ROOT)
}

fn qa_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 7000))
}

#[rstest]
#[case::nested("/home/dev/app/svc", "/workspace/source/svc")]
#[case::empty("", "")]
#[case::outside("/elsewhere", "/elsewhere")]
fn exec_with_path_appends_translated_argument(
    info: EnvironmentInfo,
    #[case] host_path: &str,
    #[case] expected: &'static str,
) {
    let mut target = MockTarget::new();
    target
        .expect_exec()
        .withf(move |cmd, _| cmd.tokens() == ["./detect.sh", "--json", expected])
        .times(1)
        .returning(|_, _| Ok(ExecOutput::new("{}", "", 0)));
    let env = Environment::from_target(info, None, container_translator(), Box::new(target));
    let output = env
        .exec_with_path(&Command::new(["./detect.sh", "--json"]), host_path)
        .expect("exec");
    assert_eq!(output.stdout(), "{}");
}

#[rstest]
fn qa_address_is_exported(info: EnvironmentInfo) {
    let mut target = MockTarget::new();
    target
        .expect_exec()
        .withf(|_, options| {
            options.env() == [(String::from(QA_RPC_ADDR_ENV), String::from("127.0.0.1:7000"))]
        })
        .returning(|_, _| Ok(ExecOutput::new("", "", 0)));
    let env = Environment::from_target(
        info,
        Some(qa_addr()),
        PathTranslator::identity(),
        Box::new(target),
    );
    env.exec(&Command::new(["true"])).expect("exec");
    assert_eq!(env.qa_addr(), Some(qa_addr()));
}

#[rstest]
fn without_qa_no_environment_is_added(info: EnvironmentInfo) {
    let mut target = MockTarget::new();
    target
        .expect_exec()
        .withf(|_, options| options.env().is_empty() && options.workdir().is_none())
        .returning(|_, _| Ok(ExecOutput::new("", "", 0)));
    let env = Environment::from_target(info, None, PathTranslator::identity(), Box::new(target));
    env.exec(&Command::new(["true"])).expect("exec");
}

#[rstest]
fn not_active_passes_through(info: EnvironmentInfo) {
    let mut target = MockTarget::new();
    target.expect_exec().returning(|_, _| {
        Err(EnvironmentError::NotActive {
            environment: String::from("detector"),
            reason: String::from("container was removed"),
        })
    });
    let env = Environment::from_target(info, None, container_translator(), Box::new(target));
    let error = env
        .exec_with_path(&Command::new(["./detect.sh"]), "/home/dev/app")
        .expect_err("inactive");
    assert!(error.is_not_active());
}

#[rstest]
fn destroy_and_copy_out_delegate(info: EnvironmentInfo) {
    let mut target = MockTarget::new();
    target.expect_teardown().times(1).returning(|| Ok(()));
    target
        .expect_copy_out()
        .withf(|pairs| pairs.len() == 1)
        .times(1)
        .returning(|_| Ok(()));
    target.expect_is_container().return_const(true);
    let mut env = Environment::from_target(info, None, container_translator(), Box::new(target));
    assert!(env.is_container());
    env.copy_out(&[CopyPair::new("/home/dev/out", "/workspace/out")])
        .expect("copy out");
    env.destroy().expect("destroy");
}

#[rstest]
fn exposes_host_layout(info: EnvironmentInfo) {
    let env = Environment::from_target(
        info,
        None,
        container_translator(),
        Box::new(MockTarget::new()),
    );
    assert_eq!(env.name(), "detector");
    assert_eq!(env.source(), Path::new("/home/dev/app"));
    assert_eq!(env.context(), Path::new("/plugins/detector"));
    assert_eq!(env.rel_templates_dir(), Path::new("templates"));
    assert_eq!(env.info().templates_dir(), PathBuf::from("/plugins/detector/templates"));
    assert_eq!(env.encode(Path::new("/plugins/detector/t")), "/workspace/context/t");
    assert_eq!(env.decode("/workspace/source/svc"), PathBuf::from("/home/dev/app/svc"));
}

#[cfg(unix)]
#[test]
fn host_environment_passes_paths_unchanged() {
    let source = tempfile::tempdir().expect("source");
    let context = tempfile::tempdir().expect("context");
    let info = EnvironmentInfo::new("echo", source.path(), context.path());
    let env = Environment::host(info, Some(qa_addr()), None);
    let dir = source.path().join("svc");
    let output = env
        .exec_with_path(
            &Command::new(["sh", "-c", "printf '%s|%s' \"$0\" \"$SHIFTKIT_QA_RPC_ADDR\""]),
            &dir.display().to_string(),
        )
        .expect("exec");
    assert_eq!(output.stdout(), format!("{}|127.0.0.1:7000", dir.display()));
    assert!(!env.is_container());
}
