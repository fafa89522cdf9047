//! Settings builder
//!
//! Merges settings from files and CLI arguments / environment.

use crate::config::{parse_id_list, Settings, SettingsFile};
use crate::error::ConfigError;
use std::path::PathBuf;

/// Builder for merging settings sources
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
        }
    }

    /// Load settings from an explicit file, or the default locations
    ///
    /// An explicitly named file must exist and parse.
    pub fn with_file(mut self, path: Option<&str>) -> Result<Self, ConfigError> {
        let file_settings = match path {
            Some(path) => Some(SettingsFile::load(path)?),
            None => SettingsFile::load_default(),
        };

        if let Some(settings) = file_settings {
            self.settings = settings;
        }

        Ok(self)
    }

    /// Extend base operator ids from a `,`/`;` separated list
    pub fn with_admin_ids(mut self, raw: Option<&str>) -> Self {
        if let Some(raw) = raw {
            self.settings.access.admin_ids.extend(parse_id_list(raw));
        }
        self
    }

    /// Override the state document location
    pub fn with_state_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(p) = path {
            self.settings.general.state_path = p;
        }
        self
    }

    /// Override the command timeout
    pub fn with_command_timeout(mut self, secs: Option<u64>) -> Self {
        if let Some(s) = secs {
            self.settings.general.command_timeout_secs = s;
        }
        self
    }

    /// Override the Telegram bot token
    pub fn with_telegram_token(mut self, token: Option<String>) -> Self {
        if let Some(t) = token.filter(|t| !t.trim().is_empty()) {
            self.settings.telegram.token = Some(t.trim().to_string());
        }
        self
    }

    /// Build the final settings
    pub fn build(self) -> Settings {
        self.settings
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
