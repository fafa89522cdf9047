//! Directory backups as checksummed tar.gz archives
//!
//! Archives live in one flat directory next to a `<archive>.sha256` file in
//! `sha256sum` format. Restores list the archive first and refuse members
//! that would land outside the target directory.

use crate::domain::{is_contained_member, ArchiveName};
use crate::error::{AppError, DomainError, Result};
use crate::exec::{command_report, CommandRunner};

use chrono::{DateTime, Local};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Archives shown by a listing unless asked otherwise
pub const DEFAULT_LIST_LIMIT: usize = 20;

const ARCHIVE_SUFFIX: &str = ".tar.gz";
const ARCHIVE_TIMEOUT_FLOOR: Duration = Duration::from_secs(3600);
const LISTING_TIMEOUT_FLOOR: Duration = Duration::from_secs(600);

/// A freshly written archive
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupInfo {
    pub source: PathBuf,
    pub archive: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
}

impl BackupInfo {
    pub fn report(&self) -> String {
        format!(
            "Backup created\nSource: {}\nArchive: {}\nSize: {:.2} MB\nSHA256: {}",
            self.source.display(),
            self.archive.display(),
            self.size_bytes as f64 / 1024.0 / 1024.0,
            self.sha256
        )
    }
}

/// One archive in the backup directory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupEntry {
    pub name: String,
    pub size_bytes: u64,
    pub modified: DateTime<Local>,
}

/// Archive listing, newest first
pub fn format_backups(entries: &[BackupEntry]) -> String {
    if entries.is_empty() {
        return "No backups".to_string();
    }
    let mut output = format!("Backups ({})\n", entries.len());
    for entry in entries {
        output.push_str(&format!(
            "  {:<44} {:>10.2} MB  {}\n",
            entry.name,
            entry.size_bytes as f64 / 1024.0 / 1024.0,
            entry.modified.format("%Y-%m-%d %H:%M")
        ));
    }
    output.trim_end().to_string()
}

/// `<source name>_<timestamp>.tar.gz` with unsafe characters folded into `_`
pub fn archive_name(source: &Path, now: DateTime<Local>) -> String {
    let base = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rootfs".to_string());

    let mut safe = String::with_capacity(base.len());
    let mut folding = false;
    for c in base.chars() {
        if c.is_ascii_alphanumeric() || "_.-".contains(c) {
            safe.push(c);
            folding = false;
        } else if !folding {
            safe.push('_');
            folding = true;
        }
    }
    let safe = match safe.trim_matches('_') {
        "" => "backup",
        trimmed => trimmed,
    };
    format!("{}_{}{}", safe, now.format("%Y%m%d_%H%M%S"), ARCHIVE_SUFFIX)
}

/// Hex SHA-256 of a file, read in 1 MiB chunks
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 1 << 20];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Location of the checksum written next to an archive
pub fn checksum_path(archive: &Path) -> PathBuf {
    let mut path = OsString::from(archive.as_os_str());
    path.push(".sha256");
    PathBuf::from(path)
}

/// Creates, lists, restores and deletes archives in one directory
pub struct BackupService {
    runner: Arc<dyn CommandRunner>,
    dir: PathBuf,
    command_timeout: Duration,
}

impl BackupService {
    pub fn new(runner: Arc<dyn CommandRunner>, dir: PathBuf, command_timeout: Duration) -> Self {
        Self {
            runner,
            dir,
            command_timeout,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Pack `source` into a new archive and write its checksum
    pub async fn create(&self, source: &Path) -> Result<BackupInfo> {
        let is_dir = tokio::fs::metadata(source)
            .await
            .is_ok_and(|meta| meta.is_dir());
        if !is_dir {
            return Err(DomainError::NotADirectory(source.display().to_string()).into());
        }
        tokio::fs::create_dir_all(&self.dir).await?;

        let archive = self.dir.join(archive_name(source, Local::now()));
        let (parent, member) = match (source.parent(), source.file_name()) {
            (Some(parent), Some(name)) => (
                parent.display().to_string(),
                name.to_string_lossy().into_owned(),
            ),
            _ => ("/".to_string(), ".".to_string()),
        };
        let archive_arg = archive.display().to_string();

        log::info!("Backing up {} to {}", source.display(), archive.display());
        let result = self
            .runner
            .run_argv(
                &["tar", "-czf", &archive_arg, "-C", &parent, &member],
                self.command_timeout.max(ARCHIVE_TIMEOUT_FLOOR),
            )
            .await;
        if !result.success() {
            if let Err(e) = tokio::fs::remove_file(&archive).await {
                log::debug!("No partial archive to remove: {}", e);
            }
            return Err(AppError::CommandFailed(command_report(
                "Backup",
                &result,
                1500,
            )));
        }

        let hashed = archive.clone();
        let sha256 = tokio::task::spawn_blocking(move || sha256_file(&hashed))
            .await
            .map_err(io::Error::other)??;
        let file_name = archive
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        tokio::fs::write(
            checksum_path(&archive),
            format!("{}  {}\n", sha256, file_name),
        )
        .await?;
        let size_bytes = tokio::fs::metadata(&archive).await?.len();

        Ok(BackupInfo {
            source: source.to_path_buf(),
            archive,
            size_bytes,
            sha256,
        })
    }

    /// Archives in the backup directory, newest first
    pub async fn list(&self, limit: usize) -> Result<Vec<BackupEntry>> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(ARCHIVE_SUFFIX) {
                continue;
            }
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            entries.push(BackupEntry {
                name,
                size_bytes: meta.len(),
                modified: DateTime::<Local>::from(meta.modified()?),
            });
        }
        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        entries.truncate(limit);
        Ok(entries)
    }

    /// Path of an existing archive
    pub async fn resolve(&self, name: &ArchiveName) -> Result<PathBuf> {
        let path = self.dir.join(name.as_str());
        let is_file = tokio::fs::metadata(&path)
            .await
            .is_ok_and(|meta| meta.is_file());
        if is_file {
            Ok(path)
        } else {
            Err(DomainError::BackupNotFound(name.to_string()).into())
        }
    }

    /// Unpack an archive into `target`; returns the number of members
    pub async fn restore(&self, name: &ArchiveName, target: &Path) -> Result<usize> {
        let archive = self.resolve(name).await?;
        let archive_arg = archive.display().to_string();
        let timeout = self.command_timeout.max(LISTING_TIMEOUT_FLOOR);

        let listing = self
            .runner
            .run_argv(&["tar", "-tzf", &archive_arg], timeout)
            .await;
        if !listing.success() {
            return Err(AppError::CommandFailed(command_report(
                "Archive listing",
                &listing,
                1500,
            )));
        }
        let members: Vec<&str> = listing
            .stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect();
        if let Some(unsafe_member) = members.iter().find(|m| !is_contained_member(m)) {
            return Err(DomainError::UnsafeArchive(unsafe_member.to_string()).into());
        }

        tokio::fs::create_dir_all(target).await?;
        let target_arg = target.display().to_string();
        log::info!("Restoring {} into {}", name, target.display());
        let result = self
            .runner
            .run_argv(
                &["tar", "-xzf", &archive_arg, "-C", &target_arg],
                self.command_timeout.max(ARCHIVE_TIMEOUT_FLOOR),
            )
            .await;
        if !result.success() {
            return Err(AppError::CommandFailed(command_report(
                "Restore", &result, 1500,
            )));
        }
        Ok(members.len())
    }

    /// Remove an archive and its checksum
    pub async fn delete(&self, name: &ArchiveName) -> Result<()> {
        let archive = self.resolve(name).await?;
        tokio::fs::remove_file(&archive).await?;
        match tokio::fs::remove_file(checksum_path(&archive)).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Cannot remove checksum of {}: {}", name, e),
        }
        log::info!("Deleted backup {}", name);
        Ok(())
    }
}
