//! Persistent configuration store
//!
//! Owns the [`StateDocument`]. One async mutex guards both the cached copy and
//! the file, so no two mutations interleave and the cache never runs ahead of
//! the disk. Reads hand out clones.
//!
//! Other processes (the CLI next to a running daemon) write the same file.
//! Every access compares the file's identity with the one last seen and
//! re-reads the document when it moved, so their changes are picked up
//! without a restart.

use crate::config::StateDocument;
use crate::domain::{
    dedup_ordered, normalize_operator_ids, normalize_ports, normalize_services, Cooldown, Metric,
    OperatorId, Percent, PollInterval, Port, ServiceName,
};
use crate::error::{ConfigError, DomainError, Result};
use crate::config::AlertConfig;

use std::io::{self, Write};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::{Mutex, MutexGuard};

/// Async-safe owner of the persisted state document
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    state: Mutex<Cached>,
}

#[derive(Debug)]
struct Cached {
    doc: StateDocument,
    stamp: Option<FileStamp>,
}

/// Identity of the backing file. Atomic writes always produce a new inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    inode: u64,
    len: u64,
    modified: Option<SystemTime>,
}

enum Loaded {
    Missing,
    Unusable,
    Document(StateDocument),
}

impl ConfigStore {
    /// Load the document at `path`, falling back to defaults when it is
    /// missing or unreadable. Never fails.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stamp = file_stamp(&path).await;
        let doc = match load_document(&path).await {
            Loaded::Document(doc) => doc,
            Loaded::Missing | Loaded::Unusable => StateDocument::default(),
        };
        Self {
            path,
            state: Mutex::new(Cached { doc, stamp }),
        }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file if another writer replaced it since the last access
    ///
    /// Returns whether the cached document changed. A file that became
    /// unreadable or corrupt keeps the cached copy; a removed file resets
    /// to defaults.
    pub async fn reload_if_changed(&self) -> bool {
        let mut cached = self.state.lock().await;
        self.refresh(&mut cached).await
    }

    /// Copy of the whole document
    pub async fn snapshot(&self) -> StateDocument {
        self.current().await.doc.clone()
    }

    /// Copy of the alerts section
    pub async fn alerts(&self) -> AlertConfig {
        self.current().await.doc.alerts.clone()
    }

    pub async fn set_alert_enabled(&self, enabled: bool) -> Result<bool> {
        self.update(|doc| doc.alerts.enabled = enabled).await
    }

    /// Store a metric threshold, clamped into 1-100
    pub async fn set_threshold(&self, metric: Metric, value: i64) -> Result<Percent> {
        let value = Percent::clamped(value);
        self.update(|doc| *doc.alerts.threshold_mut(metric) = value)
            .await?;
        Ok(value)
    }

    /// Store the poll interval, clamped into 10-3600 seconds
    pub async fn set_poll_interval(&self, seconds: i64) -> Result<PollInterval> {
        let value = PollInterval::clamped(seconds);
        self.update(|doc| doc.alerts.poll_interval_seconds = value)
            .await?;
        Ok(value)
    }

    /// Store the cooldown, clamped into 30-86400 seconds
    pub async fn set_cooldown(&self, seconds: i64) -> Result<Cooldown> {
        let value = Cooldown::clamped(seconds);
        self.update(|doc| doc.alerts.cooldown_seconds = value).await?;
        Ok(value)
    }

    /// Replace the watch list; invalid names are dropped, duplicates removed,
    /// at most 20 kept
    pub async fn set_watched_services<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<ServiceName>> {
        let services = normalize_services(names);
        self.update(|doc| doc.alerts.watched_services = services.clone())
            .await?;
        Ok(services)
    }

    /// Append one service; `Ok(false)` if already present or the list is full
    pub async fn add_watched_service(&self, name: &str) -> Result<bool> {
        let name = ServiceName::new(name)?;
        self.update(|doc| {
            let mut services = doc.alerts.watched_services.clone();
            services.push(name);
            doc.alerts.watched_services = normalize_services(&services);
        })
        .await
    }

    pub async fn remove_watched_service(&self, name: &str) -> Result<bool> {
        let name = name.trim().to_string();
        self.update(|doc| {
            doc.alerts
                .watched_services
                .retain(|service| service.as_str() != name)
        })
        .await
    }

    pub async fn notification_destination(&self) -> Option<OperatorId> {
        self.current().await.doc.runtime.notification_destination
    }

    pub async fn set_notification_destination(&self, chat: OperatorId) -> Result<bool> {
        self.update(|doc| doc.runtime.notification_destination = Some(chat))
            .await
    }

    pub async fn extra_authorized_ids(&self) -> Vec<OperatorId> {
        self.current().await.doc.runtime.extra_authorized_ids.clone()
    }

    /// Authorize another operator; `Ok(false)` if already listed or the list is full
    pub async fn add_authorized_id(&self, id: OperatorId) -> Result<bool> {
        if id <= 0 {
            return Err(DomainError::InvalidOperatorId(id.to_string()).into());
        }
        self.update(|doc| {
            let ids = &doc.runtime.extra_authorized_ids;
            doc.runtime.extra_authorized_ids =
                normalize_operator_ids(ids.iter().copied().chain([id]));
        })
        .await
    }

    /// Revoke an extra operator. Base operators are protected.
    pub async fn remove_authorized_id(&self, id: OperatorId, base: &[OperatorId]) -> Result<bool> {
        if base.contains(&id) {
            return Err(DomainError::ProtectedOperator(id).into());
        }
        self.update(|doc| doc.runtime.extra_authorized_ids.retain(|x| *x != id))
            .await
    }

    /// Base operators followed by the extra ones, without duplicates
    pub async fn list_authorized_ids(&self, base: &[OperatorId]) -> Vec<OperatorId> {
        let cached = self.current().await;
        dedup_ordered(
            base.iter()
                .chain(cached.doc.runtime.extra_authorized_ids.iter())
                .copied(),
        )
    }

    /// Pure membership check against the base and extra lists
    pub async fn is_authorized(&self, id: OperatorId, base: &[OperatorId]) -> bool {
        if base.contains(&id) {
            return true;
        }
        self.current()
            .await
            .doc
            .runtime
            .extra_authorized_ids
            .contains(&id)
    }

    /// Persisted safe ports, or `fallback` when none are stored
    pub async fn firewall_ports(&self, fallback: &[Port]) -> Vec<Port> {
        let ports = self.current().await.doc.runtime.firewall_safe_ports.clone();
        if ports.is_empty() {
            fallback.to_vec()
        } else {
            ports
        }
    }

    pub async fn set_firewall_ports(&self, ports: &[Port]) -> Result<Vec<Port>> {
        let ports = normalize_ports(ports.iter().map(|p| i64::from(p.get())));
        self.update(|doc| doc.runtime.firewall_safe_ports = ports.clone())
            .await?;
        Ok(ports)
    }

    pub async fn firewall_enabled(&self) -> bool {
        self.current().await.doc.runtime.firewall_enabled
    }

    pub async fn set_firewall_enabled(&self, enabled: bool) -> Result<bool> {
        self.update(|doc| doc.runtime.firewall_enabled = enabled)
            .await
    }

    /// Stored compose file path, empty when none was chosen
    pub async fn compose_project(&self) -> String {
        self.current().await.doc.runtime.compose_project_path.clone()
    }

    /// Store the compose file path; callers validate it first
    pub async fn set_compose_project(&self, path: &Path) -> Result<bool> {
        let path = path.display().to_string();
        self.update(|doc| doc.runtime.compose_project_path = path)
            .await
    }

    /// Lock the cache after picking up external changes
    async fn current(&self) -> MutexGuard<'_, Cached> {
        let mut cached = self.state.lock().await;
        self.refresh(&mut cached).await;
        cached
    }

    async fn refresh(&self, cached: &mut Cached) -> bool {
        let stamp = file_stamp(&self.path).await;
        if stamp == cached.stamp {
            return false;
        }
        cached.stamp = stamp;

        let doc = match load_document(&self.path).await {
            Loaded::Document(doc) => doc,
            Loaded::Missing => StateDocument::default(),
            Loaded::Unusable => return false,
        };
        if doc == cached.doc {
            return false;
        }
        log::info!("State reloaded from {}", self.path.display());
        cached.doc = doc;
        true
    }

    /// Apply `change` to a copy; persist and commit only if it differs
    ///
    /// The cache is left untouched when the write fails.
    async fn update<F>(&self, change: F) -> Result<bool>
    where
        F: FnOnce(&mut StateDocument),
    {
        let mut cached = self.current().await;
        let mut candidate = cached.doc.clone();
        change(&mut candidate);

        if candidate == cached.doc {
            log::debug!("State unchanged, skipping write");
            return Ok(false);
        }

        let path = self.path.clone();
        let doc = candidate.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &doc))
            .await
            .map_err(|e| ConfigError::Persist {
                path: self.path.display().to_string(),
                source: io::Error::other(e),
            })??;
        log::debug!("State written to {}", self.path.display());

        cached.stamp = file_stamp(&self.path).await;
        cached.doc = candidate;
        Ok(true)
    }
}

async fn file_stamp(path: &Path) -> Option<FileStamp> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    Some(FileStamp {
        inode: meta.ino(),
        len: meta.len(),
        modified: meta.modified().ok(),
    })
}

async fn load_document(path: &Path) -> Loaded {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("No state at {}, using defaults", path.display());
            return Loaded::Missing;
        }
        Err(e) => {
            log::warn!("Cannot read {}: {}; using defaults", path.display(), e);
            return Loaded::Unusable;
        }
    };

    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(value) if value.is_object() => Loaded::Document(StateDocument::from_value(&value)),
        Ok(_) => {
            log::warn!("{} is not a JSON object; using defaults", path.display());
            Loaded::Unusable
        }
        Err(e) => {
            log::warn!("Corrupt state in {}: {}; using defaults", path.display(), e);
            Loaded::Unusable
        }
    }
}

/// Replace `path` with the serialized document via a temp file in the same
/// directory and a rename
pub fn write_atomic(path: &Path, doc: &StateDocument) -> std::result::Result<(), ConfigError> {
    let persist_err = |source: io::Error| ConfigError::Persist {
        path: path.display().to_string(),
        source,
    };

    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(persist_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(persist_err)?;
    serde_json::to_writer_pretty(&mut tmp, doc)?;
    tmp.write_all(b"\n").map_err(persist_err)?;
    tmp.as_file().sync_all().map_err(persist_err)?;
    tmp.persist(path).map_err(|e| persist_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use tempfile::TempDir;

    async fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::open(dir.path().join("state.json")).await
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;
        assert_eq!(store.snapshot().await, StateDocument::default());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{\"alerts\": {\"enabled\": tr").unwrap();
        let store = ConfigStore::open(&path).await;
        assert_eq!(store.snapshot().await, StateDocument::default());

        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let store = ConfigStore::open(&path).await;
        assert_eq!(store.snapshot().await, StateDocument::default());
    }

    #[tokio::test]
    async fn test_thresholds_are_clamped() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;

        assert_eq!(store.set_threshold(Metric::Cpu, 250).await.unwrap().get(), 100);
        assert_eq!(store.set_threshold(Metric::Ram, -5).await.unwrap().get(), 1);
        assert_eq!(store.set_poll_interval(1).await.unwrap().get(), 10);
        assert_eq!(store.set_cooldown(10_000_000).await.unwrap().get(), 86400);

        let alerts = store.alerts().await;
        assert_eq!(alerts.cpu_threshold.get(), 100);
        assert_eq!(alerts.ram_threshold.get(), 1);
        assert_eq!(alerts.disk_threshold.get(), 90);
    }

    #[tokio::test]
    async fn test_changes_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;
        store.set_alert_enabled(true).await.unwrap();
        store.set_threshold(Metric::Disk, 80).await.unwrap();
        store.set_watched_services(&["nginx", "ssh"]).await.unwrap();
        store.set_notification_destination(-100123).await.unwrap();

        let reopened = store_in(&dir).await;
        assert_eq!(reopened.snapshot().await, store.snapshot().await);
    }

    #[tokio::test]
    async fn test_watched_services_normalised() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;

        let stored = store
            .set_watched_services(&["nginx", "bad name", "nginx", "docker.service"])
            .await
            .unwrap();
        let names: Vec<&str> = stored.iter().map(ServiceName::as_str).collect();
        assert_eq!(names, vec!["nginx", "docker.service"]);

        assert!(!store.add_watched_service("nginx").await.unwrap());
        assert!(store.add_watched_service("sshd").await.unwrap());
        assert!(matches!(
            store.add_watched_service("rm -rf").await,
            Err(AppError::Domain(DomainError::InvalidServiceName(_)))
        ));
        assert!(store.remove_watched_service("nginx").await.unwrap());
        assert!(!store.remove_watched_service("nginx").await.unwrap());
    }

    #[tokio::test]
    async fn test_watched_services_capped() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;
        let names: Vec<String> = (0..30).map(|i| format!("svc{}", i)).collect();
        let stored = store.set_watched_services(&names).await.unwrap();
        assert_eq!(stored.len(), 20);
        assert_eq!(stored[0].as_str(), "svc0");
        assert!(!store.add_watched_service("extra").await.unwrap());
    }

    #[tokio::test]
    async fn test_noop_mutation_skips_write() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;

        assert!(store.set_threshold(Metric::Cpu, 85).await.is_ok());
        let inode = std::fs::metadata(store.path()).unwrap().ino();

        store.set_threshold(Metric::Cpu, 85).await.unwrap();
        assert!(!store.set_alert_enabled(false).await.unwrap());
        assert!(!store.set_firewall_enabled(false).await.unwrap());
        assert_eq!(std::fs::metadata(store.path()).unwrap().ino(), inode);
    }

    #[tokio::test]
    async fn test_authorization() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;
        let base = [1, 2];

        assert!(store.is_authorized(1, &base).await);
        assert!(!store.is_authorized(7, &base).await);
        assert!(!store.path().exists());

        assert!(store.add_authorized_id(7).await.unwrap());
        assert!(!store.add_authorized_id(7).await.unwrap());
        assert!(store.add_authorized_id(0).await.is_err());
        assert!(store.is_authorized(7, &base).await);
        assert_eq!(store.list_authorized_ids(&base).await, vec![1, 2, 7]);

        assert!(matches!(
            store.remove_authorized_id(1, &base).await,
            Err(AppError::Domain(DomainError::ProtectedOperator(1)))
        ));
        assert!(store.remove_authorized_id(7, &base).await.unwrap());
        assert!(!store.is_authorized(7, &base).await);
    }

    #[tokio::test]
    async fn test_firewall_ports_fallback() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;
        let fallback = [Port::new(22).unwrap()];

        assert_eq!(store.firewall_ports(&fallback).await, fallback.to_vec());

        let ports = [Port::new(8080).unwrap(), Port::new(8080).unwrap(), Port::new(53).unwrap()];
        let stored = store.set_firewall_ports(&ports).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(store.firewall_ports(&fallback).await, stored);
    }

    #[tokio::test]
    async fn test_compose_project() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;
        assert!(store
            .set_compose_project(Path::new("/srv/app/compose.yml"))
            .await
            .unwrap());
        assert_eq!(store.compose_project().await, "/srv/app/compose.yml");
    }

    #[tokio::test]
    async fn test_external_write_is_picked_up() {
        let dir = TempDir::new().unwrap();
        let daemon = store_in(&dir).await;
        assert!(!daemon.alerts().await.enabled);

        let cli = store_in(&dir).await;
        cli.set_alert_enabled(true).await.unwrap();
        cli.set_poll_interval(600).await.unwrap();

        let alerts = daemon.alerts().await;
        assert!(alerts.enabled);
        assert_eq!(alerts.poll_interval_seconds.get(), 600);
        assert!(!daemon.reload_if_changed().await);
    }

    #[tokio::test]
    async fn test_mutation_merges_external_changes() {
        let dir = TempDir::new().unwrap();
        let first = store_in(&dir).await;
        let second = store_in(&dir).await;

        first.set_threshold(Metric::Cpu, 70).await.unwrap();
        second.set_threshold(Metric::Ram, 60).await.unwrap();

        let reopened = store_in(&dir).await.alerts().await;
        assert_eq!(reopened.cpu_threshold.get(), 70);
        assert_eq!(reopened.ram_threshold.get(), 60);
    }

    #[tokio::test]
    async fn test_corrupt_rewrite_keeps_cache() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;
        store.set_alert_enabled(true).await.unwrap();

        std::fs::write(store.path(), "{\"alerts\": {\"ena").unwrap();
        assert!(!store.reload_if_changed().await);
        assert!(store.alerts().await.enabled);

        std::fs::remove_file(store.path()).unwrap();
        assert!(store.reload_if_changed().await);
        assert!(!store.alerts().await.enabled);
    }

    #[tokio::test]
    async fn test_failed_write_commits_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;
        store.set_alert_enabled(true).await.unwrap();

        // A non-empty directory in place of the file makes the rename fail
        std::fs::remove_file(store.path()).unwrap();
        std::fs::create_dir(store.path()).unwrap();
        std::fs::write(store.path().join("keep"), "previous").unwrap();
        let before = store.alerts().await;

        let result = store.set_threshold(Metric::Cpu, 42).await;
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::Persist { .. }))
        ));
        assert_eq!(store.alerts().await, before);
        assert_eq!(
            std::fs::read_to_string(store.path().join("keep")).unwrap(),
            "previous"
        );
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("state.json")]);
    }

    #[test]
    fn test_write_atomic_replaces_instead_of_rewriting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        write_atomic(&path, &StateDocument::default()).unwrap();
        let previous = std::fs::read_to_string(&path).unwrap();

        // A hard link keeps pointing at the old inode after a rename
        let link = dir.path().join("old.json");
        std::fs::hard_link(&path, &link).unwrap();

        let mut doc = StateDocument::default();
        doc.alerts.enabled = true;
        write_atomic(&path, &doc).unwrap();

        assert_eq!(std::fs::read_to_string(&link).unwrap(), previous);
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["alerts"]["enabled"], true);
    }

    #[test]
    fn test_write_atomic_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");
        write_atomic(&path, &StateDocument::default()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["alerts"]["cpu_threshold"], 90);
        assert_eq!(value["runtime"]["firewall_enabled"], false);
    }
}
