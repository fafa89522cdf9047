//! Domain models for hostwarden
//!
//! This module contains the validated value types shared by the config store,
//! the alert engine and the operator actions. Types are validated (or clamped)
//! on construction.

pub mod limits;
pub mod network;
pub mod service;
pub mod storage;

pub use limits::{Cooldown, Metric, Percent, PollInterval};
pub use network::{
    normalize_operator_ids, normalize_ports, parse_ip, parse_operator_id, parse_pid,
    parse_ports_csv, OperatorId, Port,
};
pub use service::{normalize_services, parse_service_list, ServiceName};
pub use storage::{is_contained_member, parse_absolute_path, ArchiveName, ContainerName};

use std::collections::HashSet;
use std::hash::Hash;

/// Remove duplicates while keeping first-seen order
pub fn dedup_ordered<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
