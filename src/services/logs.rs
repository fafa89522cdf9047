//! Journal queries

use crate::domain::ServiceName;
use crate::error::DomainError;
use crate::exec::{command_report, shell_quote, CommandRunner};

use std::sync::Arc;
use std::time::Duration;

/// Lower bound for journal query timeouts
pub const LOG_TIMEOUT_FLOOR: Duration = Duration::from_secs(90);
/// Lower bound for the full-text search timeout
pub const SEARCH_TIMEOUT_FLOOR: Duration = Duration::from_secs(120);
/// Shortest accepted search query
pub const MIN_QUERY_CHARS: usize = 2;

const REPORT_LIMIT: usize = 3500;
const AUTH_FILTER: &str = "journalctl -n 500 --no-pager \
    | grep -Ei 'sshd|sudo|authentication|failed password|invalid user' \
    | tail -n 150 || true";

/// Read-only journal views
pub struct LogService {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl LogService {
    pub fn new(runner: Arc<dyn CommandRunner>, command_timeout: Duration) -> Self {
        Self {
            runner,
            timeout: command_timeout.max(LOG_TIMEOUT_FLOOR),
        }
    }

    /// Last 150 kernel messages
    pub async fn kernel(&self) -> String {
        let result = self
            .runner
            .run_argv(&["journalctl", "-k", "-n", "150", "--no-pager"], self.timeout)
            .await;
        command_report("Kernel logs", &result, REPORT_LIMIT)
    }

    /// Last 150 entries at priority `err` or worse
    pub async fn errors(&self) -> String {
        let result = self
            .runner
            .run_argv(&["journalctl", "-p", "err", "-n", "150", "--no-pager"], self.timeout)
            .await;
        command_report("Error logs", &result, REPORT_LIMIT)
    }

    /// Authentication-related entries from the recent journal
    pub async fn auth(&self) -> String {
        let result = self.runner.run_shell(AUTH_FILTER, self.timeout).await;
        command_report("Auth logs", &result, REPORT_LIMIT)
    }

    /// Last 150 entries of one unit
    pub async fn unit(&self, name: &ServiceName) -> String {
        let result = self
            .runner
            .run_argv(
                &["journalctl", "-u", name.as_str(), "-n", "150", "--no-pager"],
                self.timeout,
            )
            .await;
        command_report(&format!("journalctl -u {}", name), &result, REPORT_LIMIT)
    }

    /// Case-insensitive search over the last 800 journal lines
    pub async fn search(&self, query: &str) -> Result<String, DomainError> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Err(DomainError::QueryTooShort(MIN_QUERY_CHARS));
        }
        let command = search_command(query);
        let timeout = self.timeout.max(SEARCH_TIMEOUT_FLOOR);
        let result = self.runner.run_shell(&command, timeout).await;
        Ok(command_report(&format!("Search: {}", query), &result, REPORT_LIMIT))
    }
}

/// Shell pipeline for a journal search; the query is passed as one quoted word
pub fn search_command(query: &str) -> String {
    format!(
        "(journalctl -n 800 --no-pager | grep -i -- {} | tail -n 180) || true",
        shell_quote(query)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRunner;

    fn logs(timeout: u64) -> (Arc<MockRunner>, LogService) {
        let runner = Arc::new(MockRunner::new());
        let svc = LogService::new(runner.clone(), Duration::from_secs(timeout));
        (runner, svc)
    }

    #[test]
    fn test_search_command_quotes_query() {
        assert_eq!(
            search_command("oom killer"),
            "(journalctl -n 800 --no-pager | grep -i -- 'oom killer' | tail -n 180) || true"
        );
        assert!(search_command("x'; rm -rf /").contains(r#"'x'"'"'; rm -rf /'"#));
    }

    #[tokio::test]
    async fn test_search_rejects_short_query() {
        let (runner, svc) = logs(30);
        assert_eq!(svc.search(" a ").await, Err(DomainError::QueryTooShort(2)));
        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn test_timeouts_have_floors() {
        let (runner, svc) = logs(30);
        svc.kernel().await;
        svc.search("sshd").await.unwrap();
        let calls = runner.calls();
        assert_eq!(calls[0].1, Duration::from_secs(90));
        assert_eq!(calls[1].1, Duration::from_secs(120));

        let (runner, svc) = logs(600);
        svc.errors().await;
        assert_eq!(runner.calls()[0].1, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_unit_and_auth_commands() {
        let (runner, svc) = logs(30);
        svc.unit(&ServiceName::new("ssh.service").unwrap()).await;
        svc.auth().await;
        let commands = runner.commands();
        assert_eq!(commands[0], "journalctl -u ssh.service -n 150 --no-pager");
        assert!(commands[1].starts_with("journalctl -n 500 --no-pager | grep -Ei"));
    }
}
