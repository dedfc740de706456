//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vidrelay_common::{Error, Result};
use vidrelay_providers::ProvidersConfig;

use crate::validate::UploadLimits;

/// Default HTTP bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Top-level configuration, stored as JSON.
///
/// Every field has a default, so a partial file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database holding credentials and history.
    pub database_path: PathBuf,
    /// Address the HTTP server listens on.
    pub bind: String,
    /// File size and type limits.
    pub upload: UploadLimits,
    /// HTTP client settings, endpoint overrides and retry policy.
    pub providers: ProvidersConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: data_dir().join("vidrelay.db"),
            bind: DEFAULT_BIND.to_string(),
            upload: UploadLimits::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidrelay")
}

impl AppConfig {
    /// `<config_dir>/vidrelay/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidrelay")
            .join("config.json")
    }

    /// Load configuration from `path`.
    ///
    /// # Postconditions
    /// - A missing file yields the defaults
    ///
    /// # Errors
    /// - `Validation` if the file is not valid configuration JSON
    /// - `Io` if the file exists but cannot be read
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json(&raw).map_err(|e| match e {
            Error::Validation(msg) => {
                Error::Validation(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse configuration JSON.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| Error::Validation(format!("Malformed configuration: {}", e)))
    }

    /// Write configuration as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
