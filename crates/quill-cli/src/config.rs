//! CLI configuration: a JSON file under the platform config dir, with
//! environment and flag overrides layered on top.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Base URL of the platform API, without a trailing slash.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
        }
    }
}

impl Config {
    /// Location of the config file (`<config dir>/quill/config.json`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|base| base.join("quill").join("config.json"))
    }

    /// Load the config, falling back to defaults when no file exists.
    /// `QUILL_LOG_LEVEL` and `QUILL_API_URL` override file values.
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing config from {}", path.display()))
    }

    fn apply_env(&mut self) {
        if let Ok(level) = std::env::var("QUILL_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(url) = std::env::var("QUILL_API_URL") {
            self.api_base_url = url;
        }
    }

    /// Validated API base URL.
    pub fn api_url(&self) -> Result<Url> {
        Url::parse(&self.api_base_url)
            .with_context(|| format!("invalid API base URL: {}", self.api_base_url))
    }
}
