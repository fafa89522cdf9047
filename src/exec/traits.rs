//! Trait definitions for command execution
//!
//! These traits abstract over process spawning to enable testing with mocks.

use super::{CommandSpec, ExecResult};
use async_trait::async_trait;
use std::time::Duration;

/// Trait for running external commands
///
/// Implementations must never fail: non-zero exits, timeouts and spawn
/// errors are all reported through the returned [`ExecResult`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command, killing it once `timeout` elapses
    async fn execute(&self, spec: &CommandSpec, timeout: Duration) -> ExecResult;

    /// Run a program with arguments
    async fn run_argv(&self, args: &[&str], timeout: Duration) -> ExecResult {
        self.execute(&CommandSpec::argv(args.iter().copied()), timeout)
            .await
    }

    /// Run a shell command line
    async fn run_shell(&self, command: &str, timeout: Duration) -> ExecResult {
        self.execute(&CommandSpec::shell(command), timeout).await
    }
}
