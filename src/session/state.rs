//! Conversation state machine
//!
//! Each operator is either idle or waiting for one specific piece of input.
//! Input is validated at this boundary: a bad value keeps the state so the
//! operator can retry, a good one yields an [`Intent`] and returns to idle.
//! Terminal mode is the exception and stays active until cancelled.

use crate::domain::service::is_clear_keyword;
use crate::domain::{
    parse_absolute_path, parse_ip, parse_operator_id, parse_pid, parse_ports_csv,
    parse_service_list, ArchiveName, ContainerName, Cooldown, Metric, OperatorId, Percent,
    PollInterval, Port, ServiceName,
};
use crate::error::DomainError;
use crate::services::logs::MIN_QUERY_CHARS;
use crate::services::{ComposeAction, DockerQuery};
use std::net::IpAddr;
use std::path::PathBuf;

/// What the conversation is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingThreshold(Metric),
    AwaitingPollInterval,
    AwaitingCooldown,
    AwaitingServices,
    AwaitingOpenPort,
    AwaitingClosePort,
    AwaitingBanIp,
    AwaitingSafePorts,
    AwaitingPanicIp,
    AwaitingAddAdmin,
    AwaitingRemoveAdmin,
    AwaitingKillPid,
    AwaitingLogUnit,
    AwaitingLogSearch,
    AwaitingComposePath,
    AwaitingContainerLogs,
    AwaitingBackupSource,
    /// `<archive> <target directory>` on one line
    AwaitingBackupRestore,
    AwaitingBackupDelete,
    /// Every line is run as a shell command
    Terminal,
}

/// Validated operator request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SetThreshold(Metric, Percent),
    SetPollInterval(PollInterval),
    SetCooldown(Cooldown),
    /// Replace the watch list; empty clears it
    SetWatchedServices(Vec<ServiceName>),
    OpenPort(Port),
    ClosePort(Port),
    BanIp(IpAddr),
    SetSafePorts(Vec<Port>),
    ApplyPanicProfile(IpAddr),
    AddAdmin(OperatorId),
    RemoveAdmin(OperatorId),
    KillProcess(u32),
    UnitLogs(ServiceName),
    SearchLogs(String),
    RunCommand(String),
    /// Compose file or project directory; checked on disk when run
    SetComposeProject(PathBuf),
    Compose(ComposeAction),
    Docker(DockerQuery),
    ContainerLogs(ContainerName),
    ListBackups,
    CreateBackup(PathBuf),
    RestoreBackup {
        archive: ArchiveName,
        target: PathBuf,
    },
    DeleteBackup(ArchiveName),
}

impl ConversationState {
    /// Validate input for this state
    pub fn accept(&self, text: &str) -> Result<Intent, DomainError> {
        let text = text.trim();
        match self {
            Self::Idle => Err(DomainError::UnknownAction(text.to_string())),
            Self::AwaitingThreshold(metric) => {
                Ok(Intent::SetThreshold(*metric, Percent::parse(text)?))
            }
            Self::AwaitingPollInterval => Ok(Intent::SetPollInterval(PollInterval::parse(text)?)),
            Self::AwaitingCooldown => Ok(Intent::SetCooldown(Cooldown::parse(text)?)),
            Self::AwaitingServices => {
                if is_clear_keyword(text) {
                    Ok(Intent::SetWatchedServices(Vec::new()))
                } else {
                    Ok(Intent::SetWatchedServices(parse_service_list(text)?))
                }
            }
            Self::AwaitingOpenPort => Ok(Intent::OpenPort(text.parse()?)),
            Self::AwaitingClosePort => Ok(Intent::ClosePort(text.parse()?)),
            Self::AwaitingBanIp => Ok(Intent::BanIp(parse_ip(text)?)),
            Self::AwaitingSafePorts => Ok(Intent::SetSafePorts(parse_ports_csv(text)?)),
            Self::AwaitingPanicIp => Ok(Intent::ApplyPanicProfile(parse_ip(text)?)),
            Self::AwaitingAddAdmin => Ok(Intent::AddAdmin(parse_operator_id(text)?)),
            Self::AwaitingRemoveAdmin => Ok(Intent::RemoveAdmin(parse_operator_id(text)?)),
            Self::AwaitingKillPid => Ok(Intent::KillProcess(parse_pid(text)?)),
            Self::AwaitingLogUnit => Ok(Intent::UnitLogs(ServiceName::new(text)?)),
            Self::AwaitingLogSearch => {
                if text.chars().count() < MIN_QUERY_CHARS {
                    return Err(DomainError::QueryTooShort(MIN_QUERY_CHARS));
                }
                Ok(Intent::SearchLogs(text.to_string()))
            }
            Self::AwaitingComposePath => Ok(Intent::SetComposeProject(parse_absolute_path(text)?)),
            Self::AwaitingContainerLogs => Ok(Intent::ContainerLogs(ContainerName::new(text)?)),
            Self::AwaitingBackupSource => Ok(Intent::CreateBackup(parse_absolute_path(text)?)),
            Self::AwaitingBackupRestore => {
                if text.is_empty() {
                    return Err(DomainError::Empty);
                }
                let (archive, target) = text
                    .split_once(char::is_whitespace)
                    .ok_or(DomainError::MissingRestoreTarget)?;
                Ok(Intent::RestoreBackup {
                    archive: ArchiveName::new(archive)?,
                    target: parse_absolute_path(target)?,
                })
            }
            Self::AwaitingBackupDelete => Ok(Intent::DeleteBackup(ArchiveName::new(text)?)),
            Self::Terminal => {
                if text.is_empty() {
                    return Err(DomainError::Empty);
                }
                Ok(Intent::RunCommand(text.to_string()))
            }
        }
    }

    /// State after input was accepted
    pub fn after_accept(&self) -> Self {
        match self {
            Self::Terminal => Self::Terminal,
            _ => Self::Idle,
        }
    }

    /// Question shown while waiting in this state
    pub fn prompt(&self) -> String {
        match self {
            Self::Idle => "Choose an action".to_string(),
            Self::AwaitingThreshold(metric) => format!(
                "{} threshold in percent ({}-{}):",
                metric.label(),
                Percent::MIN,
                Percent::MAX
            ),
            Self::AwaitingPollInterval => format!(
                "Check interval in seconds ({}-{}):",
                PollInterval::MIN,
                PollInterval::MAX
            ),
            Self::AwaitingCooldown => format!(
                "Repeat cooldown in seconds ({}-{}):",
                Cooldown::MIN,
                Cooldown::MAX
            ),
            Self::AwaitingServices => {
                "Services to watch, comma separated (or `none` to clear):".to_string()
            }
            Self::AwaitingOpenPort => "Port to open (1-65535):".to_string(),
            Self::AwaitingClosePort => "Port to close (1-65535):".to_string(),
            Self::AwaitingBanIp => "IP address to ban:".to_string(),
            Self::AwaitingSafePorts => "Safe ports, e.g. 22,80,443:".to_string(),
            Self::AwaitingPanicIp => "Your external IP to keep SSH access:".to_string(),
            Self::AwaitingAddAdmin => "Operator id to authorize:".to_string(),
            Self::AwaitingRemoveAdmin => "Operator id to revoke:".to_string(),
            Self::AwaitingKillPid => "PID to kill:".to_string(),
            Self::AwaitingLogUnit => "systemd unit name:".to_string(),
            Self::AwaitingLogSearch => "Search text (at least 2 characters):".to_string(),
            Self::AwaitingComposePath => {
                "Absolute path of the compose file or project directory:".to_string()
            }
            Self::AwaitingContainerLogs => "Container name:".to_string(),
            Self::AwaitingBackupSource => "Absolute path of the directory to back up:".to_string(),
            Self::AwaitingBackupRestore => {
                "Archive name and target directory, e.g. `etc_20250101_120000.tar.gz /srv/restore`:"
                    .to_string()
            }
            Self::AwaitingBackupDelete => "Archive name to delete:".to_string(),
            Self::Terminal => "Terminal mode: each message runs as a shell command".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_rejects_text() {
        assert!(ConversationState::Idle.accept("hello").is_err());
    }

    #[test]
    fn test_threshold_input_is_strict() {
        let state = ConversationState::AwaitingThreshold(Metric::Disk);
        assert_eq!(
            state.accept(" 85 ").unwrap(),
            Intent::SetThreshold(Metric::Disk, Percent::clamped(85))
        );
        assert!(matches!(state.accept("150"), Err(DomainError::OutOfRange { .. })));
        assert!(state.accept("eighty").is_err());
        assert_eq!(state.after_accept(), ConversationState::Idle);
    }

    #[test]
    fn test_service_list_input() {
        let state = ConversationState::AwaitingServices;
        match state.accept("nginx, redis").unwrap() {
            Intent::SetWatchedServices(names) => assert_eq!(names.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(state.accept("none").unwrap(), Intent::SetWatchedServices(Vec::new()));
        assert!(state.accept("nginx, bad name").is_err());
    }

    #[test]
    fn test_network_inputs() {
        assert_eq!(
            ConversationState::AwaitingOpenPort.accept("8080").unwrap(),
            Intent::OpenPort(Port::new(8080).unwrap())
        );
        assert!(ConversationState::AwaitingClosePort.accept("70000").is_err());
        assert!(ConversationState::AwaitingBanIp.accept("10.0.0.300").is_err());
        assert!(matches!(
            ConversationState::AwaitingPanicIp.accept("2001:db8::1"),
            Ok(Intent::ApplyPanicProfile(_))
        ));
        assert_eq!(
            ConversationState::AwaitingSafePorts.accept("22; 443,x").unwrap(),
            Intent::SetSafePorts(vec![Port::new(22).unwrap(), Port::new(443).unwrap()])
        );
    }

    #[test]
    fn test_terminal_stays_active() {
        let state = ConversationState::Terminal;
        assert_eq!(
            state.accept("df -h").unwrap(),
            Intent::RunCommand("df -h".to_string())
        );
        assert_eq!(state.after_accept(), ConversationState::Terminal);
        assert_eq!(state.accept("  "), Err(DomainError::Empty));
    }

    #[test]
    fn test_misc_inputs() {
        assert_eq!(
            ConversationState::AwaitingKillPid.accept("123").unwrap(),
            Intent::KillProcess(123)
        );
        assert!(ConversationState::AwaitingAddAdmin.accept("-5").is_err());
        assert_eq!(
            ConversationState::AwaitingLogSearch.accept("x"),
            Err(DomainError::QueryTooShort(2))
        );
    }

    #[test]
    fn test_path_inputs_must_be_absolute() {
        assert_eq!(
            ConversationState::AwaitingComposePath.accept(" /srv/app ").unwrap(),
            Intent::SetComposeProject(PathBuf::from("/srv/app"))
        );
        assert!(matches!(
            ConversationState::AwaitingBackupSource.accept("etc"),
            Err(DomainError::RelativePath(_))
        ));
        assert!(ConversationState::AwaitingContainerLogs
            .accept("web; reboot")
            .is_err());
    }

    #[test]
    fn test_backup_restore_input() {
        let state = ConversationState::AwaitingBackupRestore;
        assert_eq!(
            state.accept("etc_20250101_120000.tar.gz  /srv/restore").unwrap(),
            Intent::RestoreBackup {
                archive: ArchiveName::new("etc_20250101_120000.tar.gz").unwrap(),
                target: PathBuf::from("/srv/restore"),
            }
        );
        assert_eq!(
            state.accept("etc.tar.gz"),
            Err(DomainError::MissingRestoreTarget)
        );
        assert!(matches!(
            state.accept("../etc.tar.gz /srv"),
            Err(DomainError::InvalidArchiveName(_))
        ));
        assert!(ConversationState::AwaitingBackupDelete.accept("a/b").is_err());
    }

    #[test]
    fn test_prompts_mention_ranges() {
        assert!(ConversationState::AwaitingPollInterval.prompt().contains("10-3600"));
        assert!(ConversationState::AwaitingThreshold(Metric::Cpu)
            .prompt()
            .starts_with("CPU"));
    }
}
