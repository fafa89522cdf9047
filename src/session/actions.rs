//! Execution of validated intents

use crate::config::ConfigStore;
use crate::domain::OperatorId;
use crate::error::Result;
use crate::firewall::{Firewall, Profile};
use crate::services::{
    format_backups, BackupService, DockerService, LogService, SystemService, TerminalService,
    DEFAULT_LIST_LIMIT,
};
use crate::session::Intent;

use std::sync::Arc;

/// Everything an accepted intent may touch
pub struct Actions {
    store: Arc<ConfigStore>,
    base: Vec<OperatorId>,
    firewall: Firewall,
    system: SystemService,
    logs: LogService,
    terminal: TerminalService,
    docker: DockerService,
    backups: BackupService,
}

impl Actions {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<ConfigStore>,
        base: Vec<OperatorId>,
        firewall: Firewall,
        system: SystemService,
        logs: LogService,
        terminal: TerminalService,
        docker: DockerService,
        backups: BackupService,
    ) -> Self {
        Self {
            store,
            base,
            firewall,
            system,
            logs,
            terminal,
            docker,
            backups,
        }
    }

    pub fn system(&self) -> &SystemService {
        &self.system
    }

    /// Carry out an intent and describe the outcome
    pub async fn execute(&self, intent: Intent) -> Result<String> {
        log::debug!("Executing {:?}", intent);
        let text = match intent {
            Intent::SetThreshold(metric, value) => {
                let stored = self
                    .store
                    .set_threshold(metric, i64::from(value.get()))
                    .await?;
                format!("{} threshold set to {}%", metric.label(), stored)
            }
            Intent::SetPollInterval(interval) => {
                let stored = self
                    .store
                    .set_poll_interval(i64::from(interval.get()))
                    .await?;
                format!("Check interval set to {}s", stored)
            }
            Intent::SetCooldown(cooldown) => {
                let stored = self.store.set_cooldown(i64::from(cooldown.get())).await?;
                format!("Alert cooldown set to {}s", stored)
            }
            Intent::SetWatchedServices(names) => {
                let stored = self.store.set_watched_services(&names).await?;
                if stored.is_empty() {
                    "Watched services cleared".to_string()
                } else {
                    let list: Vec<&str> = stored.iter().map(|s| s.as_str()).collect();
                    format!("Watched services: {}", list.join(", "))
                }
            }
            Intent::OpenPort(port) => self.firewall.open_port(port).await,
            Intent::ClosePort(port) => self.firewall.close_port(port).await,
            Intent::BanIp(ip) => self.firewall.ban_ip(ip).await,
            Intent::SetSafePorts(ports) => {
                let stored = self.store.set_firewall_ports(&ports).await?;
                let list: Vec<String> = stored.iter().map(ToString::to_string).collect();
                format!(
                    "Safe ports saved: {}\nEnable the firewall to apply them.",
                    list.join(", ")
                )
            }
            Intent::ApplyPanicProfile(ip) => {
                let report = self.firewall.apply_profile(&Profile::Panic(ip)).await;
                self.store.set_firewall_enabled(true).await?;
                report
            }
            Intent::AddAdmin(id) => {
                if self.store.add_authorized_id(id).await? {
                    format!("Operator {} authorized", id)
                } else {
                    format!("Operator {} not added (already listed or list full)", id)
                }
            }
            Intent::RemoveAdmin(id) => {
                if self.store.remove_authorized_id(id, &self.base).await? {
                    format!("Operator {} revoked", id)
                } else {
                    format!("Operator {} was not in the list", id)
                }
            }
            Intent::KillProcess(pid) => self.system.kill_process(pid).await,
            Intent::UnitLogs(name) => self.logs.unit(&name).await,
            Intent::SearchLogs(query) => self.logs.search(&query).await?,
            Intent::RunCommand(command) => self.terminal.run(&command).await?,
            Intent::SetComposeProject(path) => {
                let file = self.docker.set_project(&path).await?;
                format!("Compose project set to {}", file.display())
            }
            Intent::Compose(action) => self.docker.compose(action).await?,
            Intent::Docker(query) => self.docker.query(query).await,
            Intent::ContainerLogs(name) => self.docker.container_logs(&name).await,
            Intent::ListBackups => format_backups(&self.backups.list(DEFAULT_LIST_LIMIT).await?),
            Intent::CreateBackup(source) => self.backups.create(&source).await?.report(),
            Intent::RestoreBackup { archive, target } => {
                let members = self.backups.restore(&archive, &target).await?;
                format!(
                    "Restored {} into {} ({} entries)",
                    archive,
                    target.display(),
                    members
                )
            }
            Intent::DeleteBackup(archive) => {
                self.backups.delete(&archive).await?;
                format!("Deleted backup {}", archive)
            }
        };
        Ok(text)
    }
}
