//! Shared wiring for command handlers
//!
//! Resolves settings from file, environment and flags, opens the state store
//! and builds the services the handlers need.

use crate::alerts::{AlertEngine, LogNotifier, MetricsSampler, Notifier, SysinfoSampler, TelegramNotifier};
use crate::cli::args::Cli;
use crate::config::{ConfigStore, Settings, SettingsBuilder};
use crate::domain::{OperatorId, Port};
use crate::error::Result;
use crate::exec::{CommandRunner, ProcessRunner};
use crate::firewall::Firewall;
use crate::services::{
    BackupService, DockerService, LogService, SystemService, TerminalService, UpdateService,
};
use crate::session::{Actions, Gatekeeper, Session};

use std::sync::Arc;

/// Settings plus the long-lived collaborators built from them
pub struct AppContext {
    pub settings: Settings,
    pub store: Arc<ConfigStore>,
    pub runner: Arc<dyn CommandRunner>,
}

impl AppContext {
    /// Merge settings sources and open the state store
    pub async fn load(cli: &Cli) -> Result<Self> {
        let settings = SettingsBuilder::new()
            .with_file(cli.config.as_deref())?
            .with_admin_ids(cli.admin_ids.as_deref())
            .with_state_path(cli.state.clone())
            .with_command_timeout(cli.timeout)
            .with_telegram_token(cli.telegram_token.clone())
            .build();

        log::debug!("State file: {}", settings.general.state_path.display());
        let store = Arc::new(ConfigStore::open(settings.general.state_path.clone()).await);

        Ok(Self {
            settings,
            store,
            runner: Arc::new(ProcessRunner::new()),
        })
    }

    /// Operators configured in settings
    pub fn base_ids(&self) -> Vec<OperatorId> {
        self.settings.admin_ids()
    }

    /// Persisted safe ports, falling back to the configured ones
    pub async fn safe_ports(&self) -> Vec<Port> {
        self.store.firewall_ports(&self.settings.safe_ports()).await
    }

    pub fn sampler(&self) -> Arc<dyn MetricsSampler> {
        Arc::new(SysinfoSampler::new())
    }

    /// Telegram when a token is configured, the log otherwise
    pub fn notifier(&self) -> Result<Arc<dyn Notifier>> {
        match &self.settings.telegram.token {
            Some(token) => Ok(Arc::new(TelegramNotifier::new(token)?)),
            None => {
                log::info!("No Telegram token configured; notifications go to the log");
                Ok(Arc::new(LogNotifier::new()))
            }
        }
    }

    pub fn alert_engine(&self, sampler: Arc<dyn MetricsSampler>) -> Result<AlertEngine> {
        Ok(AlertEngine::new(
            self.store.clone(),
            self.runner.clone(),
            sampler,
            self.notifier()?,
            self.settings.command_timeout(),
        ))
    }

    pub fn firewall(&self) -> Firewall {
        Firewall::new(self.runner.clone(), self.settings.command_timeout())
    }

    pub fn system(&self, sampler: Arc<dyn MetricsSampler>) -> SystemService {
        SystemService::new(self.runner.clone(), sampler, self.settings.command_timeout())
    }

    pub fn logs(&self) -> LogService {
        LogService::new(self.runner.clone(), self.settings.command_timeout())
    }

    pub fn terminal(&self) -> TerminalService {
        TerminalService::new(self.runner.clone(), self.settings.terminal_timeout())
    }

    pub fn updates(&self) -> UpdateService {
        UpdateService::detect(self.runner.clone(), self.settings.command_timeout())
    }

    pub fn docker(&self) -> DockerService {
        DockerService::new(
            self.runner.clone(),
            self.store.clone(),
            self.settings.command_timeout(),
        )
    }

    /// Backups kept in the configured backup directory
    pub fn backups(&self) -> BackupService {
        BackupService::new(
            self.runner.clone(),
            self.settings.general.backup_dir.clone(),
            self.settings.command_timeout(),
        )
    }

    /// Session driver gated by the base and stored operators
    pub fn session(&self) -> Session {
        Session::new(Gatekeeper::new(self.store.clone(), self.base_ids()))
    }

    /// Intent executor sharing this context's store and runner
    pub fn actions(&self, sampler: Arc<dyn MetricsSampler>) -> Actions {
        Actions::new(
            self.store.clone(),
            self.base_ids(),
            self.firewall(),
            self.system(sampler),
            self.logs(),
            self.terminal(),
            self.docker(),
            self.backups(),
        )
    }
}
