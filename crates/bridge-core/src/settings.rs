//! Application settings management
//!
//! Non-secret configuration lives in `settings.json` inside the data
//! directory. Command-line flags may override individual values at startup.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{BridgeError, Result};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Settings file version
    pub version: u32,
    /// Timeout applied to every outbound HTTP call (login, probe, refresh, API call)
    pub request_timeout_secs: u64,
    /// User-Agent sent with outbound requests
    pub user_agent: String,
    /// Maximum characters of an upstream body quoted in auth error messages
    pub error_preview_chars: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            request_timeout_secs: 30,
            user_agent: format!("api-bridge/{}", env!("CARGO_PKG_VERSION")),
            error_preview_chars: 500,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Default data directory for settings and the JSON store
pub fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("dev", "api-bridge", "api-bridge")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| BridgeError::StorageError("Could not determine data directory".to_string()))
}

/// Settings manager
pub struct SettingsManager {
    settings_file: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    /// Load settings from `storage_dir`, falling back to defaults
    pub fn new(storage_dir: &Path) -> Self {
        let settings_file = storage_dir.join("settings.json");
        let settings = Self::load_from_file(&settings_file).unwrap_or_default();

        Self {
            settings_file,
            settings,
        }
    }

    fn load_from_file(path: &Path) -> Result<Settings> {
        if !path.exists() {
            debug!("No settings file found, using defaults");
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub async fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.settings)?;

        let temp_path = self.settings_file.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.settings_file).await?;

        debug!("Saved settings to {:?}", self.settings_file);
        Ok(())
    }

    /// Whether `settings.json` exists on disk
    pub fn is_persisted(&self) -> bool {
        self.settings_file.exists()
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
