//! # Feature: Settings
//!
//! Persisted user identity and preference toggles.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

use log::warn;
use std::sync::Arc;

use crate::core::{PipelineError, PipelineResult};
use crate::features::reminders::DEFAULT_USER_ID;
use crate::storage::{keys, KeyValueStore};

pub struct Settings {
    kv: Arc<dyn KeyValueStore>,
}

impl Settings {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    async fn read(&self, key: &str) -> PipelineResult<Option<String>> {
        self.kv
            .get(key)
            .await
            .map_err(|e| PipelineError::storage(format!("failed to read {key}: {e}")))
    }

    async fn write(&self, key: &str, value: &str) -> PipelineResult<()> {
        self.kv
            .set(key, value)
            .await
            .map_err(|e| PipelineError::storage(format!("failed to write {key}: {e}")))
    }

    async fn flag(&self, key: &str, default: bool) -> PipelineResult<bool> {
        match self.read(key).await?.as_deref() {
            None => Ok(default),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => {
                warn!("Ignoring unreadable value '{other}' for {key}");
                Ok(default)
            }
        }
    }

    /// Stored user id, or the sentinel when none has been set
    pub async fn user_id(&self) -> PipelineResult<String> {
        Ok(self
            .read(keys::USER_ID)
            .await?
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string()))
    }

    pub async fn set_user_id(&self, user_id: &str) -> PipelineResult<()> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return self
                .kv
                .remove(keys::USER_ID)
                .await
                .map_err(|e| PipelineError::storage(format!("failed to clear user id: {e}")));
        }
        self.write(keys::USER_ID, user_id).await
    }

    /// Whether chat requests may use web search. Off by default.
    pub async fn web_search(&self) -> PipelineResult<bool> {
        self.flag(keys::WEB_SEARCH, false).await
    }

    pub async fn set_web_search(&self, enabled: bool) -> PipelineResult<()> {
        self.write(keys::WEB_SEARCH, if enabled { "true" } else { "false" })
            .await
    }

    pub async fn auto_play_audio(&self) -> PipelineResult<bool> {
        self.flag(keys::AUTO_PLAY_AUDIO, false).await
    }

    pub async fn set_auto_play_audio(&self, enabled: bool) -> PipelineResult<()> {
        self.write(keys::AUTO_PLAY_AUDIO, if enabled { "true" } else { "false" })
            .await
    }
}
