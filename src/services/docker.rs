//! Docker engine queries and the compose project

use crate::config::ConfigStore;
use crate::domain::ContainerName;
use crate::error::{DomainError, Result};
use crate::exec::{command_report, CommandRunner};

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Compose file names accepted, in lookup order
pub const COMPOSE_FILE_NAMES: [&str; 3] = ["docker-compose.yml", "compose.yml", "compose.yaml"];

const QUERY_TIMEOUT_FLOOR: Duration = Duration::from_secs(90);
const LOGS_TIMEOUT_FLOOR: Duration = Duration::from_secs(120);
const LOG_TAIL_LINES: &str = "120";

/// Read-only engine queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockerQuery {
    Info,
    Containers,
    Images,
}

/// Compose project operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeAction {
    Ps,
    Up,
    Down,
    Pull,
}

impl ComposeAction {
    fn args(&self) -> &'static [&'static str] {
        match self {
            Self::Ps => &["ps"],
            Self::Up => &["up", "-d"],
            Self::Down => &["down"],
            Self::Pull => &["pull"],
        }
    }

    fn timeout_floor(&self) -> Duration {
        match self {
            Self::Ps => Duration::from_secs(90),
            Self::Up => Duration::from_secs(600),
            Self::Down => Duration::from_secs(300),
            Self::Pull => Duration::from_secs(1200),
        }
    }
}

impl FromStr for ComposeAction {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ps" => Ok(Self::Ps),
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "pull" => Ok(Self::Pull),
            other => Err(DomainError::UnknownAction(other.to_string())),
        }
    }
}

/// Compose file at `path`, or inside it when `path` is a project directory
pub async fn resolve_compose_file(path: &Path) -> Option<PathBuf> {
    if !path.is_absolute() {
        return None;
    }
    let meta = tokio::fs::metadata(path).await.ok()?;
    if meta.is_file() {
        let name = path.file_name()?.to_str()?;
        return COMPOSE_FILE_NAMES.contains(&name).then(|| path.to_path_buf());
    }
    if meta.is_dir() {
        for name in COMPOSE_FILE_NAMES {
            let candidate = path.join(name);
            if tokio::fs::metadata(&candidate)
                .await
                .is_ok_and(|m| m.is_file())
            {
                return Some(candidate);
            }
        }
    }
    None
}

/// Docker engine and compose operations
pub struct DockerService {
    runner: Arc<dyn CommandRunner>,
    store: Arc<ConfigStore>,
    command_timeout: Duration,
}

impl DockerService {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        store: Arc<ConfigStore>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            runner,
            store,
            command_timeout,
        }
    }

    pub async fn query(&self, query: DockerQuery) -> String {
        let timeout = self.command_timeout.max(QUERY_TIMEOUT_FLOOR);
        let (title, result) = match query {
            DockerQuery::Info => (
                "docker info",
                self.runner.run_argv(&["docker", "info"], timeout).await,
            ),
            DockerQuery::Containers => (
                "Containers",
                self.runner
                    .run_shell(
                        "docker ps -a --format 'table {{.Names}}\\t{{.Status}}\\t{{.Image}}\\t{{.Ports}}'",
                        timeout,
                    )
                    .await,
            ),
            DockerQuery::Images => (
                "Images",
                self.runner
                    .run_shell(
                        "docker images --format 'table {{.Repository}}\\t{{.Tag}}\\t{{.ID}}\\t{{.Size}}'",
                        timeout,
                    )
                    .await,
            ),
        };
        command_report(title, &result, 3500)
    }

    /// Last lines of one container's log
    pub async fn container_logs(&self, name: &ContainerName) -> String {
        let result = self
            .runner
            .run_argv(
                &["docker", "logs", "--tail", LOG_TAIL_LINES, name.as_str()],
                self.command_timeout.max(LOGS_TIMEOUT_FLOOR),
            )
            .await;
        command_report(&format!("docker logs {}", name), &result, 3500)
    }

    /// Validate and store the compose project; returns the compose file used
    pub async fn set_project(&self, path: &Path) -> Result<PathBuf> {
        let file = resolve_compose_file(path)
            .await
            .ok_or_else(|| DomainError::ComposeFileNotFound(path.display().to_string()))?;
        self.store.set_compose_project(&file).await?;
        log::info!("Compose project set to {}", file.display());
        Ok(file)
    }

    /// Run a compose action against the stored project
    pub async fn compose(&self, action: ComposeAction) -> Result<String> {
        let stored = self.store.compose_project().await;
        if stored.is_empty() {
            return Err(DomainError::NoComposeProject.into());
        }
        let file = resolve_compose_file(Path::new(&stored))
            .await
            .ok_or(DomainError::ComposeFileNotFound(stored))?;
        let file = file.display().to_string();

        let mut argv = vec!["docker", "compose", "-f", file.as_str()];
        argv.extend_from_slice(action.args());
        let result = self
            .runner
            .run_argv(&argv, self.command_timeout.max(action.timeout_floor()))
            .await;
        let title = format!("docker compose {}", action.args().join(" "));
        Ok(command_report(&title, &result, 3500))
    }
}
