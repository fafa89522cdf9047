//! External command execution
//!
//! Every system action shells out through a [`CommandRunner`]. The production
//! implementation is [`ProcessRunner`]; tests substitute a scripted mock.

pub mod report;
pub mod runner;
pub mod traits;

pub use report::{clip_text, command_report, compact_report, labeled_report};
pub use runner::ProcessRunner;
pub use traits::CommandRunner;

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Exit code reported when the process could not be spawned or reaped
pub const SPAWN_FAILURE_CODE: i32 = -1;

/// What to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    /// Program plus arguments, no shell interpretation
    Argv(Vec<String>),
    /// Shell command line, for pipelines and redirection
    Shell(String),
}

impl CommandSpec {
    /// Build an argument vector command
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Argv(args.into_iter().map(Into::into).collect())
    }

    /// Build a shell command
    pub fn shell(command: impl Into<String>) -> Self {
        Self::Shell(command.into())
    }

    /// Human-readable command text
    pub fn display(&self) -> String {
        match self {
            Self::Argv(args) => args
                .iter()
                .map(|arg| shell_quote(arg))
                .collect::<Vec<_>>()
                .join(" "),
            Self::Shell(command) => command.clone(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Outcome of one command execution
///
/// Produced for every invocation, including spawn failures and timeouts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecResult {
    /// Command text as executed
    pub command: String,
    /// Exit code; negative for signal termination or spawn failure
    pub exit_code: i32,
    /// Captured standard output (lossy UTF-8)
    pub stdout: String,
    /// Captured standard error (lossy UTF-8)
    pub stderr: String,
    /// Wall-clock time including the timeout window
    pub duration: Duration,
    /// The process was killed after exceeding its timeout
    pub timed_out: bool,
}

impl ExecResult {
    /// Result for a process that never started
    pub fn spawn_failure(command: String, reason: impl fmt::Display, duration: Duration) -> Self {
        Self {
            command,
            exit_code: SPAWN_FAILURE_CODE,
            stdout: String::new(),
            stderr: reason.to_string(),
            duration,
            timed_out: false,
        }
    }

    /// Exited with code 0 within the timeout
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Short status: `OK`, `TIMEOUT` or `ERR <code>`
    pub fn status_label(&self) -> String {
        if self.timed_out {
            "TIMEOUT".to_string()
        } else if self.exit_code == 0 {
            "OK".to_string()
        } else {
            format!("ERR {}", self.exit_code)
        }
    }

    /// First non-empty of trimmed stdout and stderr
    pub fn first_output(&self) -> Option<&str> {
        [self.stdout.trim(), self.stderr.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
    }
}

/// Quote a single word for a POSIX shell
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r#"'"'"'"#))
    }
}
