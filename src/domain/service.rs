//! Watched service names

use crate::error::DomainError;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Maximum number of watched services
pub const MAX_WATCHED_SERVICES: usize = 20;

static SERVICE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.@-]+$").expect("service name pattern compiles"));

/// A systemd unit name safe to pass as a single argument
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    /// Validate a service name
    ///
    /// # Errors
    /// Returns `DomainError::InvalidServiceName` if the trimmed name is empty
    /// or contains characters outside `[A-Za-z0-9_.@-]`.
    pub fn new(raw: &str) -> Result<Self, DomainError> {
        let name = raw.trim();
        if SERVICE_NAME_RE.is_match(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(DomainError::InvalidServiceName(name.to_string()))
        }
    }

    /// Get the name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ServiceName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Keep valid names only, deduplicated in first-seen order, capped at 20
pub fn normalize_services<I, S>(raw: I) -> Vec<ServiceName>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let valid = raw
        .into_iter()
        .filter_map(|item| ServiceName::new(item.as_ref()).ok());
    let mut names = super::dedup_ordered(valid);
    names.truncate(MAX_WATCHED_SERVICES);
    names
}

/// Split operator input (`,` or newline separated) into strictly validated names
///
/// # Errors
/// Returns the first invalid name, or `DomainError::Empty` for blank input.
pub fn parse_service_list(text: &str) -> Result<Vec<ServiceName>, DomainError> {
    let parts: Vec<&str> = text
        .split([',', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        return Err(DomainError::Empty);
    }
    parts.into_iter().map(ServiceName::new).collect()
}

/// Words that clear the watch list instead of naming a service
pub fn is_clear_keyword(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "none" | "clear" | "-"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(ServiceName::new("nginx").is_ok());
        assert!(ServiceName::new("getty@tty1.service").is_ok());
        assert!(ServiceName::new("  docker  ").is_ok());
        assert_eq!(ServiceName::new(" ssh ").unwrap().as_str(), "ssh");
    }

    #[test]
    fn test_invalid_names() {
        assert!(ServiceName::new("").is_err());
        assert!(ServiceName::new("foo bar").is_err());
        assert!(ServiceName::new("rm;-rf").is_err());
        assert!(ServiceName::new("$(id)").is_err());
    }

    #[test]
    fn test_normalize_dedups_and_filters() {
        let names = normalize_services(["ssh", "nginx", "bad name", "ssh", "docker", "nginx"]);
        let names: Vec<&str> = names.iter().map(ServiceName::as_str).collect();
        assert_eq!(names, vec!["ssh", "nginx", "docker"]);
    }

    #[test]
    fn test_normalize_caps_at_twenty() {
        let raw: Vec<String> = (0..30).map(|i| format!("svc{}", i)).collect();
        let names = normalize_services(&raw);
        assert_eq!(names.len(), MAX_WATCHED_SERVICES);
        assert_eq!(names[0].as_str(), "svc0");
        assert_eq!(names[19].as_str(), "svc19");
    }

    #[test]
    fn test_parse_service_list() {
        let names = parse_service_list("ssh, nginx\ndocker").unwrap();
        assert_eq!(names.len(), 3);
        assert!(matches!(
            parse_service_list("ssh, bad name"),
            Err(DomainError::InvalidServiceName(_))
        ));
        assert_eq!(parse_service_list(" , "), Err(DomainError::Empty));
    }

    #[test]
    fn test_clear_keyword() {
        assert!(is_clear_keyword("None"));
        assert!(is_clear_keyword(" - "));
        assert!(!is_clear_keyword("nginx"));
    }
}
