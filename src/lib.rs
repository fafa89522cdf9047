//! hostwarden - remote administration for a single Linux host
//!
//! This library provides the alert engine, the command runner and the
//! persistent state store behind the `hostwarden` tool, plus the operator
//! actions built on top of them.
//!
//! # Modules
//!
//! - [`alerts`]: Threshold and service alerting
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers
//! - [`config`]: Settings and persisted state
//! - [`domain`]: Domain models with validation
//! - [`error`]: Error types
//! - [`exec`]: External command execution
//! - [`firewall`]: Packet filter management
//! - [`services`]: One-shot operator actions
//! - [`session`]: Operator conversations and background tasks

pub mod alerts;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod exec;
pub mod firewall;
pub mod services;
pub mod session;

#[cfg(test)]
pub mod mock;

pub use error::{AppError, Result};
