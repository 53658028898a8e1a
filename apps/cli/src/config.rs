use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polisher_remote::RemoteConfig;
use polisher_storage::default_database_path;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub remote: RemoteConfig,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Falls back to the platform data directory when unset.
    pub database_path: Option<PathBuf>,
}

impl StorageSettings {
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(&resolve_config_path())
    }

    /// Read settings from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let parsed: Settings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse TOML from {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(parsed)
    }
}

fn resolve_config_path() -> PathBuf {
    if let Ok(path) = env::var("POLISHER_CONFIG") {
        return PathBuf::from(path);
    }

    if let Some(base) = dirs::config_dir() {
        return base.join("polisher").join("config.toml");
    }

    PathBuf::from("polisher.toml")
}
