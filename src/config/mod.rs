// Configuration management for tuneloop
// Handles loading/saving settings, with sensible defaults when config is missing

use crate::backend::DEFAULT_LOGIN_TIMEOUT;
use crate::queue::DEFAULT_CAPACITY;
use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const APP_NAME: &str = "tuneloop";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub music_directories: Vec<PathBuf>,
    pub username: Option<String>,
    pub queue_capacity: usize,
    /// JSON list of `{"Key": ..., "Command": ...}` overrides.
    pub key_functions_file: Option<PathBuf>,
    /// Comma-separated playlist names; everything else is hidden.
    pub playlist_filter: Option<String>,
    pub login_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            music_directories: vec![dirs::audio_dir().unwrap_or_else(|| PathBuf::from("~/Music"))],
            username: None,
            queue_capacity: DEFAULT_CAPACITY,
            key_functions_file: None,
            playlist_filter: None,
            login_timeout_secs: DEFAULT_LOGIN_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Reads `path`, or writes the defaults there if it does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config {}", path.display()))?;
            debug!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            info!("Wrote default config to {}", path.display());
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    /// Configured key file, or `key-functions.json` next to the config.
    pub fn key_functions_path(&self) -> Option<PathBuf> {
        self.key_functions_file
            .clone()
            .or_else(|| Self::config_dir().ok().map(|dir| dir.join("key-functions.json")))
    }

    pub fn config_dir() -> Result<PathBuf> {
        Ok(config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join(APP_NAME))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "username = \"ada\"\nqueue_capacity = 20\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.username.as_deref(), Some("ada"));
        assert_eq!(config.queue_capacity, 20);
        assert_eq!(config.login_timeout(), Duration::from_secs(9));
        assert!(config.playlist_filter.is_none());
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "queue_capacity = \"lots\"").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_explicit_key_file_wins() {
        let config = Config {
            key_functions_file: Some(PathBuf::from("/tmp/keys.json")),
            ..Config::default()
        };
        assert_eq!(config.key_functions_path(), Some(PathBuf::from("/tmp/keys.json")));
    }
}
