//! Container engine driven through the docker/podman command line.
//!
//! Every operation is a fixed argument vector handed to a [`CliRunner`]; no
//! shell is involved. The runner seam lets tests script runtime responses
//! without a daemon.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use shiftkit_config::RuntimePreference;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::engine::{ContainerEngine, CopyPair, ExecOptions};
use crate::error::EngineError;
use crate::metadata::{FileInfo, FileKind, ImageMetadata};
use crate::process::{ExecOutput, ProcessError, run_captured};

/// Tracing target for CLI engine operations.
const ENGINE_TARGET: &str = "shiftkit_container::cli";

/// Exit status `docker run` uses when the daemon could not start a container.
const RUN_LAUNCH_FAILURE: i32 = 125;

/// Entrypoint and arguments that keep a long-lived container idle.
const KEEP_ALIVE_ENTRYPOINT: &str = "tail";
const KEEP_ALIVE_ARGS: [&str; 2] = ["-f", "/dev/null"];

/// Format handed to `stat` inside containers.
const STAT_FORMAT: &str = "%n|%s|%F|%a|%Y";

/// Prefix for staging directories used when copying out of containers.
const STAGING_PREFIX: &str = ".shiftkit-copy-";

/// Name prefix for single-shot containers.
const EPHEMERAL_PREFIX: &str = "shiftkit-run-";

static EPHEMERAL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Liveness of a container as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerState {
    Running,
    Stopped,
    Missing,
}

/// Supported container runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRuntime {
    /// Docker CLI.
    Docker,
    /// Podman CLI.
    Podman,
}

impl ContainerRuntime {
    /// Binary name for this runtime.
    #[must_use]
    pub const fn binary(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }

    /// Runtimes to probe, in order, for a preference.
    #[must_use]
    pub const fn candidates(preference: RuntimePreference) -> &'static [Self] {
        match preference {
            RuntimePreference::Auto => &[Self::Docker, Self::Podman],
            RuntimePreference::Docker => &[Self::Docker],
            RuntimePreference::Podman => &[Self::Podman],
        }
    }
}

/// Runs one runtime CLI invocation.
pub trait CliRunner: Send + Sync {
    /// Runs `program` with `args`, capturing output.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the program cannot be run or times out.
    fn run(
        &self,
        program: &Path,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<ExecOutput, ProcessError>;
}

/// [`CliRunner`] that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CliRunner for SystemRunner {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<ExecOutput, ProcessError> {
        let mut command = process::Command::new(program);
        command.args(args);
        run_captured(command, timeout)
    }
}

/// [`ContainerEngine`] backed by the docker or podman CLI.
#[derive(Debug)]
pub struct CliEngine<R = SystemRunner> {
    runtime: ContainerRuntime,
    binary: PathBuf,
    runner: R,
    exec_timeout: Option<Duration>,
}

impl CliEngine<SystemRunner> {
    /// Finds the first usable runtime allowed by `preference`.
    ///
    /// A runtime is usable when its binary is on `PATH` and `version`
    /// succeeds, which requires a reachable daemon or service.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoRuntime`] when no candidate is usable.
    pub fn discover(
        preference: RuntimePreference,
        exec_timeout: Option<Duration>,
    ) -> Result<Self, EngineError> {
        let mut tried = Vec::new();
        for runtime in ContainerRuntime::candidates(preference) {
            tried.push(runtime.binary().to_owned());
            let Ok(binary) = which::which(runtime.binary()) else {
                debug!(target: ENGINE_TARGET, runtime = runtime.binary(), "runtime not on PATH");
                continue;
            };
            let probe = SystemRunner.run(
                &binary,
                &[String::from("version")],
                Some(Duration::from_secs(30)),
            );
            match probe {
                Ok(output) if output.success() => {
                    info!(
                        target: ENGINE_TARGET,
                        runtime = runtime.binary(),
                        binary = %binary.display(),
                        "selected container runtime"
                    );
                    return Ok(CliEngine::with_runner(*runtime, binary, SystemRunner)
                        .with_exec_timeout(exec_timeout));
                }
                Ok(output) => warn!(
                    target: ENGINE_TARGET,
                    runtime = runtime.binary(),
                    stderr = %output.stderr().trim(),
                    "runtime present but not responding"
                ),
                Err(err) => warn!(
                    target: ENGINE_TARGET,
                    runtime = runtime.binary(),
                    error = %err,
                    "runtime probe failed"
                ),
            }
        }
        Err(EngineError::NoRuntime { tried })
    }
}

impl<R: CliRunner> CliEngine<R> {
    /// Creates an engine using `binary` through `runner`.
    #[must_use]
    pub fn with_runner(runtime: ContainerRuntime, binary: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            runtime,
            binary: binary.into(),
            runner,
            exec_timeout: None,
        }
    }

    /// Bounds commands run inside containers.
    #[must_use]
    pub const fn with_exec_timeout(mut self, exec_timeout: Option<Duration>) -> Self {
        self.exec_timeout = exec_timeout;
        self
    }

    /// Returns the runtime this engine drives.
    #[must_use]
    pub const fn runtime(&self) -> ContainerRuntime {
        self.runtime
    }

    fn cli(&self, args: &[String]) -> Result<ExecOutput, EngineError> {
        self.cli_with_timeout(args, None)
    }

    fn cli_with_timeout(
        &self,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<ExecOutput, EngineError> {
        debug!(
            target: ENGINE_TARGET,
            runtime = self.runtime.binary(),
            args = ?args,
            "running runtime command"
        );
        Ok(self.runner.run(&self.binary, args, timeout)?)
    }

    fn ensure_container_dir(&self, container_id: &str, dir: &str) -> Result<(), EngineError> {
        let output = self.cli(&args(["exec", container_id, "mkdir", "-p", dir]))?;
        if output.success() {
            return Ok(());
        }
        Err(self
            .unavailable(container_id)?
            .unwrap_or_else(|| EngineError::CopyFailed {
                src: String::new(),
                dest: format!("{container_id}:{dir}"),
                message: output.stderr().trim().to_owned(),
            }))
    }

    fn copy_pair_out(&self, container_id: &str, pair: &CopyPair) -> Result<(), EngineError> {
        let dest = pair.host();
        let src = format!("{container_id}:{}", pair.container());
        let copy_failed = |message: String| EngineError::CopyFailed {
            src: src.clone(),
            dest: dest.display().to_string(),
            message,
        };
        let parent = dest
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|err| copy_failed(err.to_string()))?;
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(parent)
            .map_err(|err| copy_failed(err.to_string()))?;

        let output = self.cli(&[
            String::from("cp"),
            format!("{src}/."),
            staging.path().display().to_string(),
        ])?;
        if !output.success() {
            return Err(container_failure(container_id, &output)
                .unwrap_or_else(|| copy_failed(output.stderr().trim().to_owned())));
        }
        merge_into(staging.path(), dest).map_err(|err| copy_failed(err.to_string()))
    }
}

impl<R: CliRunner> ContainerEngine for CliEngine<R> {
    fn inspect_image(&self, image: &str) -> Result<ImageMetadata, EngineError> {
        let output = self.cli(&args(["image", "inspect", image]))?;
        if !output.success() {
            if mentions_missing_image(output.stderr()) {
                return Err(EngineError::ImageNotFound {
                    image: image.to_owned(),
                });
            }
            return Err(runtime_failure("image inspect", &output));
        }
        let records: Vec<ImageMetadata> =
            serde_json::from_str(output.stdout().trim()).map_err(|err| {
                EngineError::InvalidOutput {
                    operation: "image inspect",
                    message: err.to_string(),
                }
            })?;
        records
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::ImageNotFound {
                image: image.to_owned(),
            })
    }

    fn build_image(
        &self,
        image: &str,
        context: &Path,
        dockerfile: &Path,
    ) -> Result<(), EngineError> {
        let dockerfile_path = context.join(dockerfile);
        let output = self.cli(&[
            String::from("build"),
            String::from("--tag"),
            image.to_owned(),
            String::from("--file"),
            dockerfile_path.display().to_string(),
            context.display().to_string(),
        ])?;
        if output.success() {
            info!(target: ENGINE_TARGET, image, "built image");
            return Ok(());
        }
        Err(EngineError::BuildFailed {
            image: image.to_owned(),
            message: output.stderr().trim().to_owned(),
        })
    }

    fn remove_image(&self, image: &str) -> Result<(), EngineError> {
        let output = self.cli(&args(["image", "rm", image]))?;
        if output.success() {
            return Ok(());
        }
        if mentions_missing_image(output.stderr()) {
            return Err(EngineError::ImageNotFound {
                image: image.to_owned(),
            });
        }
        Err(runtime_failure("image rm", &output))
    }

    fn copy_dirs_into_image(
        &self,
        image: &str,
        new_image: &str,
        pairs: &[CopyPair],
    ) -> Result<(), EngineError> {
        let metadata = self.inspect_image(image)?;
        let container_id = self.create_container(image)?;
        let result = self
            .copy_dirs_into_container(&container_id, pairs)
            .and_then(|()| self.commit(&container_id, new_image, &metadata));
        if let Err(err) = self.stop_and_remove_container(&container_id) {
            warn!(
                target: ENGINE_TARGET,
                container = %container_id,
                error = %err,
                "failed to remove intermediate container"
            );
        }
        result
    }

    fn copy_dirs_into_container(
        &self,
        container_id: &str,
        pairs: &[CopyPair],
    ) -> Result<(), EngineError> {
        for pair in pairs {
            let src = pair.host().display().to_string();
            let dest = format!("{container_id}:{}", pair.container());
            if !pair.host().is_dir() {
                return Err(EngineError::CopyFailed {
                    src,
                    dest,
                    message: String::from("source is not a directory"),
                });
            }
            self.ensure_container_dir(container_id, pair.container())?;
            let output = self.cli(&[String::from("cp"), format!("{src}/."), dest.clone()])?;
            if !output.success() {
                return Err(container_failure(container_id, &output).unwrap_or_else(|| {
                    EngineError::CopyFailed {
                        src,
                        dest,
                        message: output.stderr().trim().to_owned(),
                    }
                }));
            }
            debug!(
                target: ENGINE_TARGET,
                src = %pair.host().display(),
                dest = %pair.container(),
                "copied into container"
            );
        }
        Ok(())
    }

    fn copy_dirs_from_container(
        &self,
        container_id: &str,
        pairs: &[CopyPair],
    ) -> Result<(), EngineError> {
        for pair in pairs {
            self.copy_pair_out(container_id, pair)?;
            debug!(
                target: ENGINE_TARGET,
                src = %pair.container(),
                dest = %pair.host().display(),
                "copied out of container"
            );
        }
        Ok(())
    }

    fn create_container(&self, image: &str) -> Result<String, EngineError> {
        let mut argv = args(["run", "--detach", "--entrypoint", KEEP_ALIVE_ENTRYPOINT, image]);
        argv.extend(KEEP_ALIVE_ARGS.iter().map(|arg| (*arg).to_owned()));
        let output = self.cli(&argv)?;
        let container_id = output.stdout().trim();
        if !output.success() || container_id.is_empty() {
            return Err(EngineError::ContainerNotStarted {
                image: image.to_owned(),
                message: output.stderr().trim().to_owned(),
            });
        }
        info!(target: ENGINE_TARGET, image, container = container_id, "started container");
        Ok(container_id.to_owned())
    }

    fn stop_and_remove_container(&self, container_id: &str) -> Result<(), EngineError> {
        let stopped = self.cli(&args(["stop", container_id]))?;
        if !stopped.success() && !mentions_missing_container(stopped.stderr()) {
            debug!(
                target: ENGINE_TARGET,
                container = container_id,
                stderr = %stopped.stderr().trim(),
                "stop failed, forcing removal"
            );
        }
        let removed = self.cli(&args(["rm", "--force", container_id]))?;
        if removed.success() || mentions_missing_container(removed.stderr()) {
            debug!(target: ENGINE_TARGET, container = container_id, "container removed");
            return Ok(());
        }
        Err(runtime_failure("rm", &removed))
    }

    fn run_cmd_in_container(
        &self,
        image: &str,
        cmd: &Command,
        options: &ExecOptions,
    ) -> Result<ExecOutput, EngineError> {
        let name = ephemeral_name();
        let mut argv = args(["run", "--rm", "--name", name.as_str()]);
        push_exec_options(&mut argv, options);
        argv.push(image.to_owned());
        argv.extend(cmd.tokens().iter().cloned());
        let output = self.run_ephemeral(&name, &argv)?;
        if output.exit_code() == RUN_LAUNCH_FAILURE {
            return Err(EngineError::ContainerNotStarted {
                image: image.to_owned(),
                message: output.stderr().trim().to_owned(),
            });
        }
        Ok(output)
    }

    fn exec_in_container(
        &self,
        container_id: &str,
        cmd: &Command,
        options: &ExecOptions,
    ) -> Result<ExecOutput, EngineError> {
        let mut argv = args(["exec"]);
        push_exec_options(&mut argv, options);
        argv.push(container_id.to_owned());
        argv.extend(cmd.tokens().iter().cloned());
        let output = match self.cli_with_timeout(&argv, self.exec_timeout) {
            Err(EngineError::Process(err @ ProcessError::Timeout { .. })) => {
                // The command keeps running inside the container once the client is killed.
                warn!(
                    target: ENGINE_TARGET,
                    container = container_id,
                    error = %err,
                    "command timed out, removing container"
                );
                if let Err(cleanup) = self.stop_and_remove_container(container_id) {
                    warn!(
                        target: ENGINE_TARGET,
                        container = container_id,
                        error = %cleanup,
                        "failed to remove container after timeout"
                    );
                }
                return Err(EngineError::Process(err));
            }
            result => result?,
        };
        if !output.success()
            && let Some(err) = self.unavailable(container_id)?
        {
            return Err(err);
        }
        Ok(output)
    }

    fn run_container(
        &self,
        image: &str,
        cmd: &Command,
        vol_src: &Path,
        vol_dest: &str,
    ) -> Result<String, EngineError> {
        let name = ephemeral_name();
        let mut argv = args(["run", "--rm", "--name", name.as_str(), "--volume"]);
        argv.push(format!("{}:{vol_dest}", vol_src.display()));
        argv.push(image.to_owned());
        argv.extend(cmd.tokens().iter().cloned());
        let output = self.run_ephemeral(&name, &argv)?;
        match output.exit_code() {
            0 => Ok(output.combined()),
            RUN_LAUNCH_FAILURE => Err(EngineError::ContainerNotStarted {
                image: image.to_owned(),
                message: output.stderr().trim().to_owned(),
            }),
            exit_code => Err(EngineError::CommandFailed {
                image: image.to_owned(),
                exit_code,
                output: output.combined(),
            }),
        }
    }

    fn stat(&self, container_id: &str, path: &str) -> Result<FileInfo, EngineError> {
        let output = self.cli(&args(["exec", container_id, "stat", "-c", STAT_FORMAT, path]))?;
        if !output.success() {
            if let Some(err) = self.unavailable(container_id)? {
                return Err(err);
            }
            if output.stderr().contains("No such file") {
                return Err(EngineError::PathNotFound {
                    container: container_id.to_owned(),
                    path: path.to_owned(),
                });
            }
            return Err(runtime_failure("stat", &output));
        }
        parse_stat(output.stdout())
    }
}

impl<R: CliRunner> CliEngine<R> {
    /// Runs a `run --rm --name <name>` invocation, removing the container
    /// when the client is killed on timeout.
    fn run_ephemeral(&self, name: &str, argv: &[String]) -> Result<ExecOutput, EngineError> {
        match self.cli_with_timeout(argv, self.exec_timeout) {
            Err(EngineError::Process(err @ ProcessError::Timeout { .. })) => {
                warn!(
                    target: ENGINE_TARGET,
                    container = name,
                    error = %err,
                    "single-shot command timed out, removing container"
                );
                let removed = self.cli(&args(["rm", "--force", name]))?;
                if !removed.success() && !mentions_missing_container(removed.stderr()) {
                    warn!(
                        target: ENGINE_TARGET,
                        container = name,
                        stderr = %removed.stderr().trim(),
                        "failed to remove timed-out container"
                    );
                }
                Err(EngineError::Process(err))
            }
            result => result,
        }
    }

    fn container_state(&self, container_id: &str) -> Result<ContainerState, EngineError> {
        let output = self.cli(&args([
            "container",
            "inspect",
            "--format",
            "{{.State.Running}}",
            container_id,
        ]))?;
        if !output.success() {
            if mentions_missing_container(output.stderr()) {
                return Ok(ContainerState::Missing);
            }
            return Err(runtime_failure("container inspect", &output));
        }
        match output.stdout().trim() {
            "true" => Ok(ContainerState::Running),
            "false" => Ok(ContainerState::Stopped),
            other => Err(EngineError::InvalidOutput {
                operation: "container inspect",
                message: format!("unexpected running state '{other}'"),
            }),
        }
    }

    /// Asks the runtime whether a failed `exec` was the container's fault.
    ///
    /// The output of a failed `exec` mixes runtime diagnostics with the
    /// command's own stderr, so it is never used to decide this.
    fn unavailable(&self, container_id: &str) -> Result<Option<EngineError>, EngineError> {
        let container = container_id.to_owned();
        Ok(match self.container_state(container_id)? {
            ContainerState::Running => None,
            ContainerState::Stopped => Some(EngineError::ContainerNotRunning { container }),
            ContainerState::Missing => Some(EngineError::ContainerNotFound { container }),
        })
    }

    fn commit(
        &self,
        container_id: &str,
        new_image: &str,
        original: &ImageMetadata,
    ) -> Result<(), EngineError> {
        // The keep-alive entrypoint must not leak into the derived image.
        let entrypoint = json_tokens(original.entrypoint())?;
        let cmd = json_tokens(original.cmd())?;
        let output = self.cli(&[
            String::from("commit"),
            String::from("--change"),
            format!("ENTRYPOINT {entrypoint}"),
            String::from("--change"),
            format!("CMD {cmd}"),
            container_id.to_owned(),
            new_image.to_owned(),
        ])?;
        if output.success() {
            info!(target: ENGINE_TARGET, image = new_image, "committed derived image");
            return Ok(());
        }
        Err(runtime_failure("commit", &output))
    }
}

fn ephemeral_name() -> String {
    let sequence = EPHEMERAL_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{EPHEMERAL_PREFIX}{}-{sequence}", process::id())
}

fn args<const N: usize>(tokens: [&str; N]) -> Vec<String> {
    tokens.iter().map(|token| (*token).to_owned()).collect()
}

fn push_exec_options(argv: &mut Vec<String>, options: &ExecOptions) {
    if let Some(dir) = options.workdir() {
        argv.push(String::from("--workdir"));
        argv.push(dir.to_owned());
    }
    for (key, value) in options.env() {
        argv.push(String::from("--env"));
        argv.push(format!("{key}={value}"));
    }
}

fn json_tokens(tokens: &[String]) -> Result<String, EngineError> {
    serde_json::to_string(tokens).map_err(|err| EngineError::InvalidOutput {
        operation: "commit",
        message: err.to_string(),
    })
}

fn mentions_missing_container(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("no such container") || lower.contains("no container with name or id")
}

fn mentions_missing_image(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("no such image")
        || lower.contains("image not known")
        || lower.contains("no such object")
}

/// Classifies a failed runtime command whose stderr is the runtime's own.
fn container_failure(container_id: &str, output: &ExecOutput) -> Option<EngineError> {
    let stderr = output.stderr();
    if mentions_missing_container(stderr) {
        return Some(EngineError::ContainerNotFound {
            container: container_id.to_owned(),
        });
    }
    if stderr.to_ascii_lowercase().contains("is not running") {
        return Some(EngineError::ContainerNotRunning {
            container: container_id.to_owned(),
        });
    }
    None
}

fn runtime_failure(operation: &'static str, output: &ExecOutput) -> EngineError {
    EngineError::Runtime {
        operation,
        message: format!(
            "exit status {}: {}",
            output.exit_code(),
            output.stderr().trim()
        ),
    }
}

fn parse_stat(stdout: &str) -> Result<FileInfo, EngineError> {
    let invalid = |message: &str| EngineError::InvalidOutput {
        operation: "stat",
        message: format!("{message}: '{}'", stdout.trim()),
    };
    let line = stdout.lines().next().ok_or_else(|| invalid("empty output"))?;
    let mut fields = line.rsplitn(5, '|');
    let modified = fields.next().and_then(|v| v.parse::<u64>().ok());
    let mode = fields.next().and_then(|v| u32::from_str_radix(v, 8).ok());
    let kind = fields.next().map(FileKind::from_stat_descriptor);
    let size = fields.next().and_then(|v| v.parse::<u64>().ok());
    let name = fields.next();
    match (name, size, kind, mode, modified) {
        (Some(name), Some(size), Some(kind), Some(mode), Some(modified)) => Ok(FileInfo {
            name: name.to_owned(),
            size,
            kind,
            mode,
            modified,
        }),
        _ => Err(invalid("malformed stat record")),
    }
}

/// Moves the contents of `staging` into `dest`, replacing files that exist.
fn merge_into(staging: &Path, dest: &Path) -> std::io::Result<()> {
    if !dest.exists() {
        return fs::rename(staging, dest).or_else(|_| {
            fs::create_dir_all(dest)?;
            merge_entries(staging, dest)
        });
    }
    merge_entries(staging, dest)
}

fn merge_entries(from: &Path, to: &Path) -> std::io::Result<()> {
    for read in fs::read_dir(from)? {
        let entry = read?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() && target.is_dir() {
            merge_entries(&entry.path(), &target)?;
        } else {
            if target.is_dir() {
                fs::remove_dir_all(&target)?;
            }
            fs::rename(entry.path(), &target)?;
        }
    }
    Ok(())
}
