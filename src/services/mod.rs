//! Service layer for one-shot operator actions
//!
//! Each service wraps a [`CommandRunner`](crate::exec::CommandRunner) and
//! returns plain-text reports ready to be shown to the operator.

pub mod backups;
pub mod docker;
pub mod logs;
pub mod system;
pub mod terminal;
pub mod updates;

pub use backups::{format_backups, BackupEntry, BackupInfo, BackupService, DEFAULT_LIST_LIMIT};
pub use docker::{resolve_compose_file, ComposeAction, DockerQuery, DockerService};
pub use logs::LogService;
pub use system::{human_uptime, render_snapshot, SystemService, UnitAction};
pub use terminal::TerminalService;
pub use updates::{PackageManager, UpdateAction, UpdateService};
