//! Runtime configuration
//!
//! Values come from an optional YAML file (`COMPANION_CONFIG`) and are then
//! overridden by `COMPANION_*` environment variables.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: YAML file layer under the environment
//! - 1.0.0: Environment-only configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::features::reminders::Platform;

/// Default timeout for every backend request, matching the chat backend's
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Database path that selects the in-memory substrate
pub const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat/intent/push backend
    pub backend_url: String,
    /// SQLite file backing the key-value substrate
    pub database_path: String,
    pub platform: Platform,
    pub log_level: String,
    pub request_timeout_secs: u64,
    /// Token handed out by the push SDK stand-in
    pub device_token: Option<String>,
    /// Whether the permission stand-in grants notification access
    pub notifications_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3000".to_string(),
            database_path: "companion.db".to_string(),
            platform: Platform::Other,
            log_level: "info".to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            device_token: None,
            notifications_enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the environment, layered over `COMPANION_CONFIG` if set
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var("COMPANION_CONFIG") {
            Ok(path) => Self::load(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(url) = env::var("COMPANION_BACKEND_URL") {
            config.backend_url = url;
        }
        if let Ok(path) = env::var("COMPANION_DATABASE_PATH") {
            config.database_path = path;
        }
        if let Ok(platform) = env::var("COMPANION_PLATFORM") {
            config.platform = platform.parse()?;
        }
        if let Ok(level) = env::var("COMPANION_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Ok(secs) = env::var("COMPANION_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = secs
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid COMPANION_REQUEST_TIMEOUT_SECS '{}': {}", secs, e))?;
        }
        if let Ok(token) = env::var("COMPANION_DEVICE_TOKEN") {
            config.device_token = Some(token).filter(|t| !t.trim().is_empty());
        }
        if let Ok(flag) = env::var("COMPANION_NOTIFICATIONS") {
            config.notifications_enabled = !matches!(
                flag.to_lowercase().as_str(),
                "denied" | "off" | "false" | "0"
            );
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "Backend URL must start with http:// or https://: {}",
                self.backend_url
            ));
        }
        if self.database_path.trim().is_empty() {
            return Err(anyhow::anyhow!("Database path must not be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Request timeout must be at least one second"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
