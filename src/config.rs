//! Library configuration.
//!
//! Embedding applications can construct a [`Config`] directly or persist it
//! as JSON at `~/.config/drawcache/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "drawcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Database file name
const DATABASE_FILE: &str = "draws.db";

/// Default endpoint of the lottery results service.
pub const DEFAULT_BASE_URL: &str = "https://www.szxk365.com/api/openapi.lottery/";

/// Default per-code retention cap; eviction runs after every successful
/// batch insert so the table never grows past this.
pub const DEFAULT_KEEP_COUNT: u32 = 100;

/// Default number of draws requested for history fetches.
pub const DEFAULT_HISTORY_SIZE: u32 = 100;

/// Upper bound the remote service accepts for history fetches.
pub const MAX_HISTORY_SIZE: u32 = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Database location; `None` picks the platform data directory.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default = "default_keep_count")]
    pub keep_count: u32,
    #[serde(default = "default_history_size")]
    pub history_size: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_keep_count() -> u32 {
    DEFAULT_KEEP_COUNT
}

fn default_history_size() -> u32 {
    DEFAULT_HISTORY_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            db_path: None,
            keep_count: DEFAULT_KEEP_COUNT,
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Resolved database path: the configured override, or the platform
    /// data directory.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.db_path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(DATABASE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.keep_count, 100);
        assert_eq!(config.history_size, 100);
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{ "api_key": "k" }"#).unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.keep_count, DEFAULT_KEEP_COUNT);
    }

    #[test]
    fn test_database_path_override() {
        let config = Config {
            db_path: Some(PathBuf::from("/tmp/custom.db")),
            ..Config::default()
        };
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/custom.db")
        );
    }
}
