//! Settings file loading
//!
//! Handles loading settings from TOML files.

use crate::config::Settings;
use crate::error::ConfigError;

use std::path::{Path, PathBuf};

/// Settings file handler
pub struct SettingsFile;

impl SettingsFile {
    /// Load settings from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;

        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the first default location that parses
    pub fn load_default() -> Option<Settings> {
        for path in Self::default_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    return Some(settings);
                }
                Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
            }
        }
        None
    }

    /// Get default settings file paths
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/hostwarden/config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("hostwarden").join("config.toml"));
        }

        paths.push(PathBuf::from("hostwarden.toml"));

        paths
    }
}
