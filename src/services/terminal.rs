//! Ad-hoc shell commands

use crate::error::DomainError;
use crate::exec::{command_report, CommandRunner, ExecResult};

use std::sync::Arc;
use std::time::Duration;

/// Runs operator-typed command lines through the shell
pub struct TerminalService {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl TerminalService {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Run a command line and return the raw result
    pub async fn execute(&self, command: &str) -> Result<ExecResult, DomainError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(DomainError::Empty);
        }
        log::info!("Terminal: {}", command);
        Ok(self.runner.run_shell(command, self.timeout).await)
    }

    /// Run a command line and render the report
    pub async fn run(&self, command: &str) -> Result<String, DomainError> {
        let result = self.execute(command).await?;
        Ok(command_report("Terminal", &result, 2800))
    }
}
