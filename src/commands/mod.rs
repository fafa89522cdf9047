//! Command handlers
//!
//! Each command handler orchestrates the execution of a CLI command.

pub mod admins;
pub mod alerts;
pub mod backup;
pub mod console;
pub mod context;
pub mod docker;
pub mod firewall;
pub mod host;
pub mod run;
pub mod status;

pub use admins::run_admins;
pub use alerts::run_alerts;
pub use backup::run_backup;
pub use console::run_console;
pub use context::AppContext;
pub use docker::run_docker;
pub use firewall::run_firewall;
pub use host::{run_logs, run_service, run_updates};
pub use run::run_daemon;
pub use status::{run_exec, run_status};
