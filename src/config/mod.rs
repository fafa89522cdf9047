//! Configuration system
//!
//! Two layers: static [`Settings`] read once from a TOML file and CLI/env
//! overrides, and the mutable [`StateDocument`] owned by the [`ConfigStore`].

pub mod builder;
pub mod file;
pub mod state;
pub mod store;

pub use builder::SettingsBuilder;
pub use file::SettingsFile;
pub use state::{AlertConfig, RuntimeConfig, StateDocument};
pub use store::ConfigStore;

use crate::domain::{normalize_operator_ids, normalize_ports, OperatorId, Port};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Ports opened by the safe-mode firewall when none are persisted
pub const DEFAULT_SAFE_PORTS: [u16; 3] = [22, 80, 443];

/// Backup archive directory when none is configured
pub const DEFAULT_BACKUP_DIR: &str = "/backup";

/// Main settings structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// General settings
    pub general: GeneralConfig,
    /// Operator access
    pub access: AccessConfig,
    /// Firewall defaults
    pub firewall: FirewallConfig,
    /// Telegram delivery
    pub telegram: TelegramConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Timeout for regular commands in seconds
    pub command_timeout_secs: u64,
    /// Timeout for ad-hoc terminal commands in seconds
    pub terminal_timeout_secs: u64,
    /// Location of the persisted state document
    pub state_path: PathBuf,
    /// Directory holding backup archives
    pub backup_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: 30,
            terminal_timeout_secs: 60,
            state_path: PathBuf::from("data/state.json"),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
        }
    }
}

/// Operator access configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AccessConfig {
    /// Base operator ids; always authorized, never removable at runtime
    pub admin_ids: Vec<OperatorId>,
}

/// Firewall configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallConfig {
    /// Ports kept open by safe mode when the store has none
    pub safe_ports: Vec<i64>,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            safe_ports: DEFAULT_SAFE_PORTS.iter().map(|p| i64::from(*p)).collect(),
        }
    }
}

/// Telegram configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot API token; notifications go to the log when unset
    pub token: Option<String>,
}

impl Settings {
    /// Timeout for regular commands
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.general.command_timeout_secs.max(1))
    }

    /// Timeout for ad-hoc terminal commands
    pub fn terminal_timeout(&self) -> Duration {
        Duration::from_secs(self.general.terminal_timeout_secs.max(1))
    }

    /// Base operator ids, normalised
    pub fn admin_ids(&self) -> Vec<OperatorId> {
        normalize_operator_ids(self.access.admin_ids.iter().copied())
    }

    /// Safe ports, falling back to 22/80/443 if the list holds nothing valid
    pub fn safe_ports(&self) -> Vec<Port> {
        let ports = normalize_ports(self.firewall.safe_ports.iter().copied());
        if ports.is_empty() {
            normalize_ports(DEFAULT_SAFE_PORTS.iter().map(|p| i64::from(*p)))
        } else {
            ports
        }
    }
}

/// Split a `,`/`;` separated id list, skipping tokens that are not positive integers
pub fn parse_id_list(raw: &str) -> Vec<OperatorId> {
    normalize_operator_ids(
        raw.split([',', ';'])
            .map(str::trim)
            .filter(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|token| token.parse::<OperatorId>().ok()),
    )
}
