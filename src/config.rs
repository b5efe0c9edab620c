//! Top-level application configuration.
//!
//! Configuration is stored in `procure.yaml` (working directory first, then
//! the platform config directory) and includes:
//! - Backend base URL and optional bearer token
//! - Debounce window and default page size for list views
//! - Request timeout and infinite-scroll proximity threshold

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Name of the configuration file.
pub const CONFIG_FILE: &str = "procure.yaml";

/// Main configuration structure
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL, e.g. `http://localhost:8080/api`
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Quiet period before typed filters are committed (default: 500)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Rows requested per page (default: 20)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Distance in pixels from the sentinel at which the next page loads (default: 200)
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold_px: f64,
}

fn default_api_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_page_size() -> u32 {
    20
}

fn default_request_timeout() -> u64 {
    30
}

fn default_scroll_threshold() -> f64 {
    200.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: None,
            debounce_ms: default_debounce_ms(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout(),
            scroll_threshold_px: default_scroll_threshold(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("debounce_ms", &self.debounce_ms)
            .field("page_size", &self.page_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("scroll_threshold_px", &self.scroll_threshold_px)
            .finish()
    }
}

impl Config {
    /// Candidate config locations, in lookup order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dirs) = directories::ProjectDirs::from("", "", "procure") {
            paths.push(dirs.config_dir().join(CONFIG_FILE));
        }
        paths
    }

    /// Load from the first existing search path, or defaults if none exist.
    /// Environment overrides are applied in both cases.
    pub fn load() -> Result<Self> {
        let config = match Self::search_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::read(&path)?,
            None => Config::default(),
        };
        config.with_env_overrides().validated()
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::read(path)?.with_env_overrides().validated()
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("PROCURE_API_URL")
            && !url.is_empty()
        {
            self.api_url = url;
        }
        self
    }

    /// Bearer token from environment variable or config file
    pub fn api_token(&self) -> Option<String> {
        if let Ok(token) = env::var("PROCURE_API_TOKEN")
            && !token.is_empty()
        {
            return Some(token);
        }
        self.api_token.clone().filter(|t| !t.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(SyncError::Config("api_url must not be empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(SyncError::Config("page_size must be at least 1".to_string()));
        }
        Ok(())
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
