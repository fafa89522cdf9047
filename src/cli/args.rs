//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands.

use crate::domain::Metric;
use crate::services::{ComposeAction, UnitAction, UpdateAction, DEFAULT_LIST_LIMIT};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Remote administration console for a single Linux host
///
/// Runs the alert engine, manages the packet filter, systemd units, logs and
/// package updates, and keeps runtime settings in a JSON state file.
#[derive(Parser, Debug)]
#[command(name = "hostwarden")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "HOSTWARDEN_CONFIG")]
    pub config: Option<String>,

    /// Path to the persisted state document
    #[arg(long, global = true, env = "HOSTWARDEN_STATE")]
    pub state: Option<PathBuf>,

    /// Base operator ids, comma or semicolon separated
    #[arg(long, global = true, env = "HOSTWARDEN_ADMIN_IDS")]
    pub admin_ids: Option<String>,

    /// Telegram bot token used for notifications
    #[arg(long, global = true, env = "HOSTWARDEN_TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Timeout for regular commands in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the alert engine until interrupted
    Run,

    /// Show host usage and alert settings
    Status,

    /// Run a shell command on the host
    Exec {
        /// Command line, passed to the shell as one string
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Configure and test alerting
    Alerts(AlertsArgs),

    /// Manage authorized operators
    Admins(AdminsArgs),

    /// Manage the packet filter
    Firewall(FirewallArgs),

    /// Control a systemd unit
    Service {
        /// Unit name
        name: String,

        /// Action to run
        #[arg(value_enum, default_value = "status")]
        action: UnitActionArg,
    },

    /// Query the system journal
    Logs(LogsArgs),

    /// Package updates through the detected package manager
    Updates {
        /// Update action
        #[arg(value_enum)]
        action: UpdateActionArg,
    },

    /// Docker engine queries and the compose project
    Docker(DockerArgs),

    /// Directory backups in the backup directory
    Backup(BackupArgs),

    /// Interactive operator console on stdin
    Console(ConsoleArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for alert commands
#[derive(Parser, Debug)]
pub struct AlertsArgs {
    #[command(subcommand)]
    pub command: AlertCommands,
}

/// Alert subcommands
#[derive(Subcommand, Debug)]
pub enum AlertCommands {
    /// Show alert settings
    Show,

    /// Turn alerting on
    Enable,

    /// Turn alerting off
    Disable,

    /// Set a usage threshold
    Set {
        /// Metric to configure
        #[arg(value_enum)]
        metric: MetricArg,

        /// Threshold in percent (1-100)
        value: String,
    },

    /// Set seconds between checks (10-3600)
    Interval { seconds: String },

    /// Set seconds between repeated alerts (30-86400)
    Cooldown { seconds: String },

    /// Replace the watched services (`none` clears the list)
    Services {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Record where notifications are delivered
    Destination { chat: i64 },

    /// Evaluate every alert once and deliver notifications
    Check,

    /// Send a test notification
    Test,
}

/// Arguments for operator commands
#[derive(Parser, Debug)]
pub struct AdminsArgs {
    #[command(subcommand)]
    pub command: AdminCommands,
}

/// Operator subcommands
#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// List base and extra operators
    List,

    /// Authorize an operator
    Add { id: String },

    /// Revoke an extra operator
    Remove { id: String },
}

/// Arguments for firewall commands
#[derive(Parser, Debug)]
pub struct FirewallArgs {
    #[command(subcommand)]
    pub command: FirewallCommands,
}

/// Firewall subcommands
#[derive(Subcommand, Debug)]
pub enum FirewallCommands {
    /// List current rules
    Rules,

    /// Default-deny policy with the safe ports open
    Enable,

    /// Remove all rules and accept everything
    Disable,

    /// Flush all rules
    Flush,

    /// Show or replace the safe ports
    SafePorts {
        /// Port list, e.g. 22,80,443
        ports: Option<String>,
    },

    /// Open a port on TCP and UDP
    Open { port: String },

    /// Close a port on TCP and UDP
    Close { port: String },

    /// Drop all traffic from an address
    Ban { ip: String },

    /// Apply a predefined profile (web, ssh, db, panic)
    Profile {
        /// Profile name
        name: String,

        /// Address kept reachable by the panic profile
        #[arg(long)]
        admin_ip: Option<String>,
    },
}

/// Arguments for journal commands
#[derive(Parser, Debug)]
pub struct LogsArgs {
    #[command(subcommand)]
    pub command: LogCommands,
}

/// Journal subcommands
#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// Kernel messages
    Kernel,

    /// Error priority entries
    Errors,

    /// SSH, sudo and authentication entries
    Auth,

    /// Entries of one unit
    Unit { name: String },

    /// Case-insensitive search over recent entries
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
}

/// Arguments for docker commands
#[derive(Parser, Debug)]
pub struct DockerArgs {
    #[command(subcommand)]
    pub command: DockerCommands,
}

/// Docker subcommands
#[derive(Subcommand, Debug)]
pub enum DockerCommands {
    /// Engine summary
    Info,

    /// All containers with status and ports
    Ps,

    /// Local images
    Images,

    /// Last lines of a container's log
    Logs { name: String },

    /// Remember the compose file or project directory
    ComposeSet { path: String },

    /// Run a compose action against the remembered project
    Compose {
        #[arg(value_enum)]
        action: ComposeActionArg,
    },
}

/// Arguments for backup commands
#[derive(Parser, Debug)]
pub struct BackupArgs {
    #[command(subcommand)]
    pub command: BackupCommands,
}

/// Backup subcommands
#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Archives, newest first
    List {
        /// Maximum number of archives shown
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },

    /// Archive a directory
    Create { path: String },

    /// Unpack an archive into a directory
    Restore { archive: String, target: String },

    /// Delete an archive and its checksum
    Delete { archive: String },
}

/// Arguments for the interactive console
#[derive(Parser, Debug)]
pub struct ConsoleArgs {
    /// Operator id to act as (defaults to the first base operator)
    #[arg(long = "as", value_name = "ID")]
    pub operator: Option<i64>,
}

/// Metric argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum MetricArg {
    Cpu,
    Ram,
    Disk,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Cpu => Metric::Cpu,
            MetricArg::Ram => Metric::Ram,
            MetricArg::Disk => Metric::Disk,
        }
    }
}

/// systemd unit action argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum UnitActionArg {
    Start,
    Stop,
    Restart,
    Status,
}

impl From<UnitActionArg> for UnitAction {
    fn from(arg: UnitActionArg) -> Self {
        match arg {
            UnitActionArg::Start => UnitAction::Start,
            UnitActionArg::Stop => UnitAction::Stop,
            UnitActionArg::Restart => UnitAction::Restart,
            UnitActionArg::Status => UnitAction::Status,
        }
    }
}

/// Update action argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum UpdateActionArg {
    Check,
    Upgrade,
    Clean,
}

impl From<UpdateActionArg> for UpdateAction {
    fn from(arg: UpdateActionArg) -> Self {
        match arg {
            UpdateActionArg::Check => UpdateAction::Check,
            UpdateActionArg::Upgrade => UpdateAction::Upgrade,
            UpdateActionArg::Clean => UpdateAction::Clean,
        }
    }
}

/// Compose action argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ComposeActionArg {
    Ps,
    Up,
    Down,
    Pull,
}

impl From<ComposeActionArg> for ComposeAction {
    fn from(arg: ComposeActionArg) -> Self {
        match arg {
            ComposeActionArg::Ps => ComposeAction::Ps,
            ComposeActionArg::Up => ComposeAction::Up,
            ComposeActionArg::Down => ComposeAction::Down,
            ComposeActionArg::Pull => ComposeAction::Pull,
        }
    }
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_status() {
        let args = Cli::try_parse_from(["hostwarden", "status"]).unwrap();
        assert!(matches!(args.command, Commands::Status));
    }

    #[test]
    fn test_cli_parse_verbose() {
        let args = Cli::try_parse_from(["hostwarden", "-v", "run"]).unwrap();
        assert!(args.verbose);
    }

    #[test]
    fn test_cli_parse_exec_keeps_flags() {
        let args = Cli::try_parse_from(["hostwarden", "exec", "ls", "-la", "/tmp"]).unwrap();
        if let Commands::Exec { command } = args.command {
            assert_eq!(command.join(" "), "ls -la /tmp");
        } else {
            panic!("Expected Exec command");
        }
    }

    #[test]
    fn test_cli_parse_alert_threshold() {
        let args = Cli::try_parse_from(["hostwarden", "alerts", "set", "disk", "85"]).unwrap();
        if let Commands::Alerts(alerts) = args.command {
            if let AlertCommands::Set { metric, value } = alerts.command {
                assert_eq!(Metric::from(metric), Metric::Disk);
                assert_eq!(value, "85");
            } else {
                panic!("Expected Set command");
            }
        } else {
            panic!("Expected Alerts command");
        }
    }

    #[test]
    fn test_cli_rejects_unknown_metric() {
        let result = Cli::try_parse_from(["hostwarden", "alerts", "set", "gpu", "85"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_panic_profile() {
        let args = Cli::try_parse_from([
            "hostwarden",
            "firewall",
            "profile",
            "panic",
            "--admin-ip",
            "198.51.100.4",
        ])
        .unwrap();
        if let Commands::Firewall(fw) = args.command {
            if let FirewallCommands::Profile { name, admin_ip } = fw.command {
                assert_eq!(name, "panic");
                assert_eq!(admin_ip.as_deref(), Some("198.51.100.4"));
            } else {
                panic!("Expected Profile command");
            }
        } else {
            panic!("Expected Firewall command");
        }
    }

    #[test]
    fn test_cli_service_default_action() {
        let args = Cli::try_parse_from(["hostwarden", "service", "nginx"]).unwrap();
        if let Commands::Service { name, action } = args.command {
            assert_eq!(name, "nginx");
            assert_eq!(UnitAction::from(action), UnitAction::Status);
        } else {
            panic!("Expected Service command");
        }
    }

    #[test]
    fn test_cli_parse_compose_action() {
        let args = Cli::try_parse_from(["hostwarden", "docker", "compose", "pull"]).unwrap();
        if let Commands::Docker(docker) = args.command {
            if let DockerCommands::Compose { action } = docker.command {
                assert_eq!(ComposeAction::from(action), ComposeAction::Pull);
            } else {
                panic!("Expected Compose command");
            }
        } else {
            panic!("Expected Docker command");
        }
        assert!(Cli::try_parse_from(["hostwarden", "docker", "compose", "restart"]).is_err());
    }

    #[test]
    fn test_cli_parse_backup_restore() {
        let args = Cli::try_parse_from([
            "hostwarden",
            "backup",
            "restore",
            "etc_20250101_120000.tar.gz",
            "/srv/restore",
        ])
        .unwrap();
        if let Commands::Backup(backup) = args.command {
            if let BackupCommands::Restore { archive, target } = backup.command {
                assert_eq!(archive, "etc_20250101_120000.tar.gz");
                assert_eq!(target, "/srv/restore");
            } else {
                panic!("Expected Restore command");
            }
        } else {
            panic!("Expected Backup command");
        }

        let args = Cli::try_parse_from(["hostwarden", "backup", "list"]).unwrap();
        assert!(matches!(
            args.command,
            Commands::Backup(BackupArgs {
                command: BackupCommands::List { limit: 20 }
            })
        ));
    }

    #[test]
    fn test_cli_console_operator() {
        let args = Cli::try_parse_from(["hostwarden", "console", "--as", "42"]).unwrap();
        if let Commands::Console(console) = args.command {
            assert_eq!(console.operator, Some(42));
        } else {
            panic!("Expected Console command");
        }
    }
}
