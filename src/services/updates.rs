//! Package updates through the host's package manager

use crate::error::DomainError;
use crate::exec::{command_report, CommandRunner};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Lower bound for check and cleanup timeouts
pub const UPDATE_TIMEOUT_FLOOR: Duration = Duration::from_secs(900);
/// Lower bound for full upgrades
pub const UPGRADE_TIMEOUT_FLOOR: Duration = Duration::from_secs(5400);

/// Supported package managers, in detection order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
    Pacman,
    Zypper,
}

/// Update operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    Check,
    Upgrade,
    Clean,
}

impl PackageManager {
    pub const ALL: [PackageManager; 5] = [
        Self::Apt,
        Self::Dnf,
        Self::Yum,
        Self::Pacman,
        Self::Zypper,
    ];

    /// Binary whose presence on PATH identifies the manager
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Pacman => "pacman",
            Self::Zypper => "zypper",
        }
    }

    /// First supported manager found on PATH
    pub fn detect() -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|pm| which::which(pm.binary()).is_ok())
    }

    /// Shell command for an action
    pub fn command(&self, action: UpdateAction) -> &'static str {
        use UpdateAction::*;
        match (self, action) {
            (Self::Apt, Check) => "apt list --upgradable 2>/dev/null",
            (Self::Apt, Upgrade) => "apt-get update -y && apt-get upgrade -y",
            (Self::Apt, Clean) => "apt-get autoremove -y && apt-get autoclean -y",
            // check-update exits 100 when updates are available
            (Self::Dnf, Check) => {
                "dnf -q check-update; code=$?; \
                 if [ $code -eq 0 ] || [ $code -eq 100 ]; then exit 0; else exit $code; fi"
            }
            (Self::Dnf, Upgrade) => "dnf upgrade -y",
            (Self::Dnf, Clean) => "dnf autoremove -y && dnf clean all",
            (Self::Yum, Check) => {
                "yum -q check-update; code=$?; \
                 if [ $code -eq 0 ] || [ $code -eq 100 ]; then exit 0; else exit $code; fi"
            }
            (Self::Yum, Upgrade) => "yum update -y",
            (Self::Yum, Clean) => "yum autoremove -y && yum clean all",
            (Self::Pacman, Check) => "pacman -Sy --noconfirm >/dev/null && (pacman -Qu || true)",
            (Self::Pacman, Upgrade) => "pacman -Syu --noconfirm",
            (Self::Pacman, Clean) => "pacman -Sc --noconfirm",
            (Self::Zypper, Check) => "zypper --non-interactive list-updates",
            (Self::Zypper, Upgrade) => "zypper --non-interactive update",
            (Self::Zypper, Clean) => "zypper --non-interactive clean --all",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self {
            Self::Apt => "APT",
            Self::Dnf => "DNF",
            Self::Yum => "YUM",
            Self::Pacman => "Pacman",
            Self::Zypper => "Zypper",
        };
        f.write_str(title)
    }
}

impl UpdateAction {
    fn title(&self) -> &'static str {
        match self {
            Self::Check => "Available updates",
            Self::Upgrade => "System upgrade",
            Self::Clean => "Package cleanup",
        }
    }
}

impl FromStr for UpdateAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "check" => Ok(Self::Check),
            "upgrade" => Ok(Self::Upgrade),
            "clean" | "cleanup" => Ok(Self::Clean),
            other => Err(DomainError::UnknownAction(other.to_string())),
        }
    }
}

/// Runs update actions with the detected package manager
pub struct UpdateService {
    runner: Arc<dyn CommandRunner>,
    manager: Option<PackageManager>,
    command_timeout: Duration,
}

impl UpdateService {
    /// Create a service using whatever manager is on PATH
    pub fn detect(runner: Arc<dyn CommandRunner>, command_timeout: Duration) -> Self {
        Self::with_manager(runner, PackageManager::detect(), command_timeout)
    }

    pub fn with_manager(
        runner: Arc<dyn CommandRunner>,
        manager: Option<PackageManager>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            runner,
            manager,
            command_timeout,
        }
    }

    pub fn manager(&self) -> Option<PackageManager> {
        self.manager
    }

    /// Timeout applied to an action
    pub fn timeout_for(&self, action: UpdateAction) -> Duration {
        let floor = match action {
            UpdateAction::Upgrade => UPGRADE_TIMEOUT_FLOOR,
            _ => UPDATE_TIMEOUT_FLOOR,
        };
        self.command_timeout.max(floor)
    }

    /// Run an action and report it
    pub async fn run(&self, action: UpdateAction) -> Result<String, DomainError> {
        let manager = self.manager.ok_or(DomainError::UnsupportedPackageManager)?;
        log::info!("Running {:?} via {}", action, manager);
        let result = self
            .runner
            .run_shell(manager.command(action), self.timeout_for(action))
            .await;
        Ok(command_report(
            &format!("{} ({})", action.title(), manager),
            &result,
            3500,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRunner;

    #[test]
    fn test_action_parse() {
        assert_eq!("cleanup".parse::<UpdateAction>().unwrap(), UpdateAction::Clean);
        assert!("dist-upgrade".parse::<UpdateAction>().is_err());
    }

    #[test]
    fn test_every_manager_has_commands() {
        for pm in PackageManager::ALL {
            for action in [UpdateAction::Check, UpdateAction::Upgrade, UpdateAction::Clean] {
                assert!(!pm.command(action).is_empty(), "{} {:?}", pm, action);
            }
        }
    }

    #[tokio::test]
    async fn test_unsupported_manager() {
        let runner = Arc::new(MockRunner::new());
        let svc = UpdateService::with_manager(runner.clone(), None, Duration::from_secs(30));
        assert_eq!(
            svc.run(UpdateAction::Check).await,
            Err(DomainError::UnsupportedPackageManager)
        );
        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn test_upgrade_uses_long_timeout() {
        let runner = Arc::new(MockRunner::new());
        let svc = UpdateService::with_manager(
            runner.clone(),
            Some(PackageManager::Apt),
            Duration::from_secs(30),
        );
        let report = svc.run(UpdateAction::Upgrade).await.unwrap();
        assert!(report.starts_with("== System upgrade (APT) =="));
        assert_eq!(
            runner.calls()[0],
            (
                "apt-get update -y && apt-get upgrade -y".to_string(),
                Duration::from_secs(5400)
            )
        );
        assert_eq!(svc.timeout_for(UpdateAction::Check), Duration::from_secs(900));
    }
}
