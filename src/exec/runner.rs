//! Tokio-based process runner
//!
//! Spawns each command in its own process group so that a timeout can kill
//! the whole pipeline, not just the shell in front of it.

use super::traits::CommandRunner;
use super::{CommandSpec, ExecResult, SPAWN_FAILURE_CODE};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// How long to keep collecting output after the process has been reaped
const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(2);

type SharedBuffer = Arc<Mutex<Vec<u8>>>;

/// Runs commands as child processes of this one
///
/// The environment is inherited unmodified and stdin is closed.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    shell: PathBuf,
    drain_grace: Duration,
}

impl ProcessRunner {
    /// Create a runner using `/bin/bash` for shell commands
    pub fn new() -> Self {
        Self {
            shell: PathBuf::from("/bin/bash"),
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }

    /// Use a different shell for [`CommandSpec::Shell`]
    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Shell used for shell commands
    pub fn shell(&self) -> &Path {
        &self.shell
    }

    fn build(&self, spec: &CommandSpec) -> Option<Command> {
        let mut command = match spec {
            CommandSpec::Argv(args) => {
                let (program, rest) = args.split_first()?;
                let mut command = Command::new(program);
                command.args(rest);
                command
            }
            CommandSpec::Shell(line) => {
                let mut command = Command::new(&self.shell);
                command.arg("-c").arg(line);
                command
            }
        };
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .process_group(0);
        Some(command)
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn execute(&self, spec: &CommandSpec, timeout: Duration) -> ExecResult {
        let started = Instant::now();
        let text = spec.display();

        let Some(mut command) = self.build(spec) else {
            return ExecResult::spawn_failure(text, "empty command", started.elapsed());
        };

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                log::debug!("Failed to spawn `{}`: {}", text, e);
                return ExecResult::spawn_failure(text, e, started.elapsed());
            }
        };

        let stdout_buf = SharedBuffer::default();
        let stderr_buf = SharedBuffer::default();
        let mut readers = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            readers.push(tokio::spawn(drain(out, Arc::clone(&stdout_buf))));
        }
        if let Some(err) = child.stderr.take() {
            readers.push(tokio::spawn(drain(err, Arc::clone(&stderr_buf))));
        }

        let (status, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => (Some(status), false),
            Ok(Err(e)) => {
                log::warn!("Failed to wait for `{}`: {}", text, e);
                (None, false)
            }
            Err(_) => {
                log::warn!("Command `{}` timed out after {:?}, killing", text, timeout);
                terminate(&mut child);
                (child.wait().await.ok(), true)
            }
        };

        collect_readers(readers, self.drain_grace).await;

        ExecResult {
            command: text,
            exit_code: status.map(exit_code).unwrap_or(SPAWN_FAILURE_CODE),
            stdout: take_lossy(&stdout_buf),
            stderr: take_lossy(&stderr_buf),
            duration: started.elapsed(),
            timed_out,
        }
    }
}

/// Kill the child's process group, then the child itself
fn terminate(child: &mut Child) {
    if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            log::debug!("killpg({}) failed: {}", pid, e);
        }
    }
    if let Err(e) = child.start_kill() {
        log::debug!("start_kill failed: {}", e);
    }
}

/// Exit code, or the negated signal number for signal-terminated processes
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|sig| -sig))
        .unwrap_or(SPAWN_FAILURE_CODE)
}

async fn drain<R: AsyncRead + Unpin>(mut reader: R, sink: SharedBuffer) {
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if let Ok(mut buf) = sink.lock() {
                    buf.extend_from_slice(&chunk[..n]);
                }
            }
        }
    }
}

/// Wait for pipe readers to hit EOF, abandoning them after `grace`
///
/// A descendant that escaped the process group can hold a pipe open forever;
/// whatever was read so far is kept either way.
async fn collect_readers(readers: Vec<JoinHandle<()>>, grace: Duration) {
    let deadline = Instant::now() + grace;
    for mut handle in readers {
        if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
            handle.abort();
        }
    }
}

fn take_lossy(buf: &SharedBuffer) -> String {
    match buf.lock() {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_defaults() {
        let runner = ProcessRunner::default();
        assert_eq!(runner.shell(), Path::new("/bin/bash"));
        assert_eq!(runner.drain_grace, DEFAULT_DRAIN_GRACE);
    }

    #[test]
    fn test_with_shell() {
        let runner = ProcessRunner::new().with_shell("/bin/sh");
        assert_eq!(runner.shell(), Path::new("/bin/sh"));
    }

    #[test]
    fn test_empty_argv_not_built() {
        let runner = ProcessRunner::new();
        assert!(runner.build(&CommandSpec::Argv(Vec::new())).is_none());
    }

    #[tokio::test]
    async fn test_empty_argv_reports_failure() {
        let runner = ProcessRunner::new();
        let result = runner
            .execute(&CommandSpec::Argv(Vec::new()), Duration::from_secs(1))
            .await;
        assert_eq!(result.exit_code, SPAWN_FAILURE_CODE);
        assert_eq!(result.stderr, "empty command");
    }

    #[tokio::test]
    async fn test_missing_program_is_not_an_error() {
        let runner = ProcessRunner::new();
        let result = runner
            .run_argv(&["hostwarden-no-such-binary-xyz"], Duration::from_secs(5))
            .await;
        assert_eq!(result.exit_code, SPAWN_FAILURE_CODE);
        assert!(!result.stderr.is_empty());
        assert!(!result.timed_out);
    }
}
