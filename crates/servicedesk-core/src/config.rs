//! Application configuration management.
//!
//! This module handles loading and saving the configuration, which holds the
//! API base URL, the optional request timeout and the default content type.
//!
//! Configuration is stored at `~/.config/servicedesk/config.json`. The
//! `SERVICEDESK_API_URL` and `SERVICEDESK_TIMEOUT_SECS` environment variables
//! override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::api::{TransportConfig, DEFAULT_CONTENT_TYPE};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "servicedesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "SERVICEDESK_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "SERVICEDESK_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub api_url: Option<String>,
    /// Absent means requests never time out
    pub timeout_secs: Option<u64>,
    pub content_type: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `SERVICEDESK_*` overrides from the process environment
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = Some(url.trim().to_string());
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            let secs = secs
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS))?;
            self.timeout_secs = Some(secs);
        }
        Ok(self)
    }

    /// Validate and convert into transport settings
    pub fn transport_config(&self) -> Result<TransportConfig> {
        let Some(ref api_url) = self.api_url else {
            bail!("No API URL configured; set {} or api_url in {}", ENV_API_URL, CONFIG_FILE);
        };
        let url = Url::parse(api_url).with_context(|| format!("Invalid API URL: {}", api_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("API URL must use http or https: {}", api_url);
        }

        let mut config = TransportConfig::new(api_url.clone());
        // Zero means no timeout, matching an absent value
        if let Some(secs) = self.timeout_secs.filter(|s| *s > 0) {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config.content_type = self
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted session
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
