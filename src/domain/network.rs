//! Ports, addresses and operator identifiers

use crate::error::DomainError;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Maximum number of persisted firewall safe ports
pub const MAX_SAFE_PORTS: usize = 50;

/// Maximum number of extra authorized operators
pub const MAX_EXTRA_OPERATORS: usize = 50;

/// Identifier of an operator or a chat destination
pub type OperatorId = i64;

/// TCP/UDP port (1-65535)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    /// Create a port from an integer, rejecting 0 and values above 65535
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if (1..=65535).contains(&value) {
            Ok(Self(value as u16))
        } else {
            Err(DomainError::InvalidPort(value.to_string()))
        }
    }

    /// Get the port number
    #[inline]
    pub const fn get(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Port {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidPort(trimmed.to_string()));
        }
        trimmed
            .parse::<i64>()
            .map_err(|_| DomainError::InvalidPort(trimmed.to_string()))
            .and_then(Self::new)
    }
}

/// Parse a `,`/`;` separated port list, skipping invalid tokens
///
/// # Errors
/// Returns `DomainError::EmptyPortList` if no token is a valid port.
pub fn parse_ports_csv(text: &str) -> Result<Vec<Port>, DomainError> {
    let ports = super::dedup_ordered(
        text.split([',', ';'])
            .filter_map(|token| token.parse::<Port>().ok()),
    );
    if ports.is_empty() {
        return Err(DomainError::EmptyPortList(text.trim().to_string()));
    }
    Ok(ports)
}

/// Keep valid ports, deduplicated in first-seen order, capped at 50
pub fn normalize_ports<I: IntoIterator<Item = i64>>(raw: I) -> Vec<Port> {
    let mut ports = super::dedup_ordered(raw.into_iter().filter_map(|v| Port::new(v).ok()));
    ports.truncate(MAX_SAFE_PORTS);
    ports
}

/// Parse an IPv4 or IPv6 address
pub fn parse_ip(text: &str) -> Result<IpAddr, DomainError> {
    let trimmed = text.trim();
    trimmed
        .parse::<IpAddr>()
        .map_err(|_| DomainError::InvalidIp(trimmed.to_string()))
}

/// Parse a positive numeric operator id
pub fn parse_operator_id(text: &str) -> Result<OperatorId, DomainError> {
    let trimmed = text.trim();
    match trimmed.parse::<OperatorId>() {
        Ok(id) if id > 0 && trimmed.bytes().all(|b| b.is_ascii_digit()) => Ok(id),
        _ => Err(DomainError::InvalidOperatorId(trimmed.to_string())),
    }
}

/// Keep positive ids, deduplicated in first-seen order, capped at 50
pub fn normalize_operator_ids<I: IntoIterator<Item = i64>>(raw: I) -> Vec<OperatorId> {
    let mut ids = super::dedup_ordered(raw.into_iter().filter(|id| *id > 0));
    ids.truncate(MAX_EXTRA_OPERATORS);
    ids
}

/// Parse a positive process id
pub fn parse_pid(text: &str) -> Result<u32, DomainError> {
    let trimmed = text.trim();
    match trimmed.parse::<u32>() {
        Ok(pid) if pid > 0 && trimmed.bytes().all(|b| b.is_ascii_digit()) => Ok(pid),
        _ => Err(DomainError::InvalidPid(trimmed.to_string())),
    }
}
