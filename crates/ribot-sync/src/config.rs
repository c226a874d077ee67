//! # Ribot Configuration
//!
//! Where the API lives and where local state is kept.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RIBOT_API_URL=https://staging.ribot.io/                            │
//! │     RIBOT_DATA_DIR=/tmp/ribot                                          │
//! │     RIBOT_REQUEST_TIMEOUT_SECS=10                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/ribot/ribot.toml (Linux)                                 │
//! │     ~/Library/Application Support/io.ribot.app/ribot.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     https://api.ribot.io/, platform data directory                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # ribot.toml
//! [api]
//! base_url = "https://api.ribot.io/"
//! request_timeout_secs = 30
//!
//! [storage]
//! data_dir = "/var/lib/ribot"
//! database_file = "ribot.db"
//! preferences_file = "ribot_app_pref_file.json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// API Settings
// =============================================================================

/// Settings for the ribot REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every endpoint path is joined onto. Keep the trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.ribot.io/".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Where the database and the preferences document live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory for both files. Defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_database_file")]
    pub database_file: String,

    #[serde(default = "default_preferences_file")]
    pub preferences_file: String,
}

fn default_database_file() -> String {
    "ribot.db".to_string()
}

fn default_preferences_file() -> String {
    "ribot_app_pref_file.json".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            data_dir: None,
            database_file: default_database_file(),
            preferences_file: default_preferences_file(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete configuration for the data layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RibotConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl RibotConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (ribot.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| SyncError::ConfigLoadFailed(e.to_string()))?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let url = &self.api.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(SyncError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                url
            )));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.storage.database_file.is_empty() || self.storage.preferences_file.is_empty() {
            return Err(SyncError::InvalidConfig(
                "database_file and preferences_file must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Applies `RIBOT_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("RIBOT_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(dir) = lookup("RIBOT_DATA_DIR") {
            debug!(dir = %dir, "Overriding data directory from environment");
            self.storage.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(timeout) = lookup("RIBOT_REQUEST_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.api.request_timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring invalid RIBOT_REQUEST_TIMEOUT_SECS"),
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("io", "ribot", "app")
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("ribot.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Directory holding the database and the preferences document.
    pub fn data_dir(&self) -> SyncResult<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::project_dirs()
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| SyncError::InvalidConfig("No data directory available".into())),
        }
    }

    pub fn database_path(&self) -> SyncResult<PathBuf> {
        Ok(self.data_dir()?.join(&self.storage.database_file))
    }

    pub fn preferences_path(&self) -> SyncResult<PathBuf> {
        Ok(self.data_dir()?.join(&self.storage.preferences_file))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.api.base_url
    }

    /// Builds a config rooted at `data_dir`, handy for tests and the CLI's
    /// `--data-dir` flag.
    pub fn with_data_dir(mut self, data_dir: impl AsRef<Path>) -> Self {
        self.storage.data_dir = Some(data_dir.as_ref().to_path_buf());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = RibotConfig::default();
        assert_eq!(config.base_url(), "https://api.ribot.io/");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.storage.preferences_file, "ribot_app_pref_file.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RibotConfig::default();

        config.api.base_url = "ftp://api.ribot.io".to_string();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.api.base_url = "http://localhost:8080/".to_string();
        assert!(config.validate().is_ok());

        config.api.request_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("RIBOT_API_URL", "https://staging.ribot.io/"),
            ("RIBOT_DATA_DIR", "/tmp/ribot"),
            ("RIBOT_REQUEST_TIMEOUT_SECS", "nope"),
        ]
        .into_iter()
        .collect();

        let mut config = RibotConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.base_url(), "https://staging.ribot.io/");
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/ribot"));
        // Unparseable values leave the default in place.
        assert_eq!(config.api.request_timeout_secs, 30);
    }

    #[test]
    fn test_paths_follow_data_dir() {
        let config = RibotConfig::default().with_data_dir("/data");
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/data/ribot.db"));
        assert_eq!(
            config.preferences_path().unwrap(),
            PathBuf::from("/data/ribot_app_pref_file.json")
        );
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ribot.toml");

        let mut config = RibotConfig::default().with_data_dir(dir.path());
        config.api.request_timeout_secs = 12;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[api]"));
        assert!(contents.contains("[storage]"));

        let parsed: RibotConfig = toml::from_str(&contents).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: RibotConfig = toml::from_str("[api]\nrequest_timeout_secs = 5\n").unwrap();
        assert_eq!(parsed.api.base_url, "https://api.ribot.io/");
        assert_eq!(parsed.api.request_timeout_secs, 5);
        assert_eq!(parsed.storage, StorageSettings::default());
    }
}
