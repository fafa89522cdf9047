//! Unified error types for hostwarden
//!
//! This module defines all error types used throughout the application.
//! Uses thiserror for ergonomic error definitions.

use crate::domain::Metric;
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from settings or state persistence
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from operator input validation
    #[error("Invalid input: {0}")]
    Domain(#[from] DomainError),

    /// Error from a notification channel
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// No base operator ids configured
    #[error("No admin ids configured")]
    NoAdmins,

    /// No notification destination registered yet
    #[error("No notification destination registered")]
    NoDestination,

    /// One host metric could not be measured
    #[error("Cannot sample {metric}: {reason}")]
    Sampling { metric: Metric, reason: String },

    /// An external command exited unsuccessfully
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from operator input validation
///
/// These never cause a state change or a command execution: the caller
/// re-prompts instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Port outside 1-65535 or not a number
    #[error("Invalid port: {0} (must be 1-65535)")]
    InvalidPort(String),

    /// Port list without a single valid entry
    #[error("No valid ports in: {0}")]
    EmptyPortList(String),

    /// Malformed IP address
    #[error("Invalid IP address: {0}")]
    InvalidIp(String),

    /// Service name not matching the allowed pattern
    #[error("Invalid service name: {0}")]
    InvalidServiceName(String),

    /// Number outside the accepted range
    #[error("Invalid value: {value} (valid range: {min}-{max})")]
    OutOfRange { value: String, min: i64, max: i64 },

    /// Operator id not a positive integer
    #[error("Invalid operator id: {0}")]
    InvalidOperatorId(String),

    /// Process id not a positive integer
    #[error("Invalid pid: {0}")]
    InvalidPid(String),

    /// Firewall profile name not recognised
    #[error("Unknown firewall profile: {0}")]
    UnknownProfile(String),

    /// Panic profile applied without an admin address
    #[error("The panic profile requires an admin IP address")]
    MissingAdminIp,

    /// Base operator ids come from settings and are read-only
    #[error("Operator {0} is configured in settings and cannot be removed")]
    ProtectedOperator(i64),

    /// Search query too short
    #[error("Query too short: at least {0} characters required")]
    QueryTooShort(usize),

    /// Empty input where a value is required
    #[error("Empty input")]
    Empty,

    /// No supported package manager found on PATH
    #[error("No supported package manager found")]
    UnsupportedPackageManager,

    /// Path that must be absolute
    #[error("Absolute path required: {0}")]
    RelativePath(String),

    /// Backup archive name with unsafe characters
    #[error("Invalid archive name: {0}")]
    InvalidArchiveName(String),

    /// Container name with unsafe characters
    #[error("Invalid container name: {0}")]
    InvalidContainerName(String),

    /// Path expected to be a directory
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// No compose file at or inside the given path
    #[error("No docker-compose.yml, compose.yml or compose.yaml at {0}")]
    ComposeFileNotFound(String),

    /// Compose action requested before a project was chosen
    #[error("No compose project configured")]
    NoComposeProject,

    /// Named archive missing from the backup directory
    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    /// Archive member escaping the extraction directory
    #[error("Archive contains an unsafe path: {0}")]
    UnsafeArchive(String),

    /// Restore request without both archive and target
    #[error("Expected an archive name and a target directory")]
    MissingRestoreTarget,

    /// Inbound action not recognised
    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

/// Errors from settings parsing and state persistence
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Settings file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Failed to write the state file
    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from notification delivery
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Transport failure (connection, TLS, timeout)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Remote API refused the message
    #[error("Rejected by {channel}: {reason}")]
    Rejected { channel: String, reason: String },
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
