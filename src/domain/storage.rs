//! Paths and names for backups and containers

use crate::error::DomainError;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

static SAFE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("safe name pattern compiles"));

/// Parse an absolute path typed by an operator; `~` expands to the home directory
///
/// # Errors
/// Returns `DomainError::Empty` for blank input and `DomainError::RelativePath`
/// for anything that is not absolute after expansion.
pub fn parse_absolute_path(text: &str) -> Result<PathBuf, DomainError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DomainError::Empty);
    }
    let path = match text.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => dirs::home_dir()
            .map(|home| home.join(rest.trim_start_matches('/')))
            .unwrap_or_else(|| PathBuf::from(text)),
        _ => PathBuf::from(text),
    };
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(DomainError::RelativePath(text.to_string()))
    }
}

/// File name of a backup archive inside the backup directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ArchiveName(String);

impl ArchiveName {
    /// Validate a bare archive file name
    ///
    /// # Errors
    /// Returns `DomainError::InvalidArchiveName` for names with separators,
    /// characters outside `[A-Za-z0-9_.-]`, or the `.`/`..` entries.
    pub fn new(raw: &str) -> Result<Self, DomainError> {
        let name = raw.trim();
        if SAFE_NAME_RE.is_match(name) && name != "." && name != ".." {
            Ok(Self(name.to_string()))
        } else {
            Err(DomainError::InvalidArchiveName(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ArchiveName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Docker container name or id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContainerName(String);

impl ContainerName {
    pub fn new(raw: &str) -> Result<Self, DomainError> {
        let name = raw.trim();
        if SAFE_NAME_RE.is_match(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(DomainError::InvalidContainerName(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContainerName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Archive member path that stays inside the extraction directory
pub fn is_contained_member(member: &str) -> bool {
    let path = Path::new(member);
    !path.is_absolute()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
