//! Delivery token manager
//!
//! Owns the single "current" push token for this device. Refresh events may
//! arrive at any time, including while a scheduling call is in flight, so
//! every registration records the generation it started from and only marks
//! the token registered if no refresh happened in between.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{PermissionProvider, TokenSource};
use crate::backend::{PushBackend, RegisterDeviceRequest};
use crate::core::{PipelineError, PipelineResult};
use crate::features::reminders::Platform;
use crate::storage::{keys, KeyValueStore};

/// Cached push token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryToken {
    pub value: String,
    pub cached_at: DateTime<Utc>,
    /// Whether the backend has this value on file for the current user
    pub registered: bool,
}

#[derive(Debug, Default)]
struct TokenState {
    token: Option<DeliveryToken>,
    /// Bumped whenever `token` is replaced by a different value
    generation: u64,
}

pub struct DeliveryTokenManager {
    permissions: Arc<dyn PermissionProvider>,
    source: Arc<dyn TokenSource>,
    push: Arc<dyn PushBackend>,
    kv: Arc<dyn KeyValueStore>,
    user_id: String,
    platform: Platform,
    state: RwLock<TokenState>,
    /// Set once permission is refused; push stays off for the session
    denial: RwLock<Option<String>>,
}

impl DeliveryTokenManager {
    pub fn new(
        permissions: Arc<dyn PermissionProvider>,
        source: Arc<dyn TokenSource>,
        push: Arc<dyn PushBackend>,
        kv: Arc<dyn KeyValueStore>,
        user_id: impl Into<String>,
        platform: Platform,
    ) -> Self {
        Self {
            permissions,
            source,
            push,
            kv,
            user_id: user_id.into(),
            platform,
            state: RwLock::new(TokenState::default()),
            denial: RwLock::new(None),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Load the token cached by a previous session, if any
    pub async fn restore(&self) -> PipelineResult<Option<DeliveryToken>> {
        let raw = self
            .kv
            .get(keys::DELIVERY_TOKEN)
            .await
            .map_err(|e| PipelineError::storage(format!("failed to read delivery token: {e}")))?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<DeliveryToken>(&raw) {
            Ok(token) => {
                let mut state = self.state.write().await;
                state.token = Some(token.clone());
                state.generation += 1;
                debug!("Restored cached delivery token (registered: {})", token.registered);
                Ok(Some(token))
            }
            Err(e) => {
                warn!("Ignoring unreadable cached delivery token: {e}");
                Ok(None)
            }
        }
    }

    /// Prompt for permission, acquire a token and register it.
    ///
    /// Registration failure is logged and leaves the device in local-only mode;
    /// it is not an error here.
    pub async fn initialize(&self, now: DateTime<Utc>) -> PipelineResult<()> {
        if let Some(reason) = self.denial.read().await.clone() {
            return Err(PipelineError::PermissionDenied(reason));
        }

        let os = self.permissions.request_os_permission().await;
        if !os.granted {
            return Err(self.deny(os.reason, "notification permission refused").await);
        }

        if self.platform.requires_two_step_permission() {
            let push = self.permissions.request_push_permission().await;
            if !push.granted {
                return Err(self.deny(push.reason, "push permission refused").await);
            }
        }

        let value = match self.source.fetch_token().await {
            Ok(Some(value)) if !value.trim().is_empty() => value,
            Ok(_) => {
                warn!("Push service returned no token");
                return Err(PipelineError::TokenUnavailable(
                    "push service returned no token".to_string(),
                ));
            }
            Err(e) => {
                warn!("Failed to fetch push token: {e}");
                return Err(PipelineError::TokenUnavailable(e.to_string()));
            }
        };

        let token = self.install(value, now).await?;
        info!("Delivery token ready (registered: {})", token.registered);

        if !token.registered {
            if let Err(e) = self.register_with_backend(now).await {
                warn!("Device registration failed, continuing in local-only mode: {e}");
            }
        }

        Ok(())
    }

    async fn deny(&self, reason: Option<String>, fallback: &str) -> PipelineError {
        let reason = reason.unwrap_or_else(|| fallback.to_string());
        warn!("Push delivery disabled for this session: {reason}");
        *self.denial.write().await = Some(reason.clone());
        PipelineError::PermissionDenied(reason)
    }

    pub async fn is_permission_denied(&self) -> bool {
        self.denial.read().await.is_some()
    }

    /// Cache `value`, keeping the registered flag only if it is unchanged
    async fn install(&self, value: String, now: DateTime<Utc>) -> PipelineResult<DeliveryToken> {
        let mut state = self.state.write().await;

        if let Some(existing) = state.token.as_ref().filter(|t| t.value == value) {
            return Ok(existing.clone());
        }

        let token = DeliveryToken {
            value,
            cached_at: now,
            registered: false,
        };
        state.token = Some(token.clone());
        state.generation += 1;
        self.persist(&token).await?;
        Ok(token)
    }

    async fn persist(&self, token: &DeliveryToken) -> PipelineResult<()> {
        let json = serde_json::to_string(token)
            .map_err(|e| PipelineError::storage(format!("failed to encode delivery token: {e}")))?;
        self.kv
            .set(keys::DELIVERY_TOKEN, &json)
            .await
            .map_err(|e| PipelineError::storage(format!("failed to write delivery token: {e}")))
    }

    pub async fn current_token(&self) -> Option<DeliveryToken> {
        self.state.read().await.token.clone()
    }

    /// Platform refresh callback. Replaces the cached token, marks it
    /// unregistered, then re-registers; a failed re-registration is logged and
    /// retried on the next scheduling attempt.
    pub async fn on_refresh(&self, value: &str, now: DateTime<Utc>) -> PipelineResult<()> {
        let value = value.trim();
        if value.is_empty() {
            return Err(PipelineError::TokenUnavailable(
                "refresh delivered an empty token".to_string(),
            ));
        }

        {
            let mut state = self.state.write().await;
            let token = DeliveryToken {
                value: value.to_string(),
                cached_at: now,
                registered: false,
            };
            state.token = Some(token.clone());
            state.generation += 1;
            self.persist(&token).await?;
        }
        info!("Delivery token refreshed, re-registering with backend");

        if let Err(e) = self.register_with_backend(now).await {
            warn!("Re-registration after token refresh failed: {e}");
        }
        Ok(())
    }

    /// Send the current token to the push backend.
    pub async fn register_with_backend(&self, now: DateTime<Utc>) -> PipelineResult<()> {
        let (value, generation) = {
            let state = self.state.read().await;
            match &state.token {
                Some(token) => (token.value.clone(), state.generation),
                None => {
                    return Err(PipelineError::TokenUnavailable(
                        "no delivery token cached".to_string(),
                    ))
                }
            }
        };

        let request = RegisterDeviceRequest {
            fcm_token: value,
            platform: self.platform,
            user_id: self.user_id.clone(),
            timestamp: now,
        };
        self.push.register_device(&request).await?;

        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!("Token was refreshed during registration; leaving newer token unregistered");
            return Ok(());
        }

        let registered = state.token.as_mut().map(|token| {
            token.registered = true;
            token.clone()
        });
        if let Some(token) = registered {
            self.persist(&token).await?;
            info!("Device registered with push backend");
        }
        Ok(())
    }

    /// Registered token usable for remote scheduling, or `None` for local-only.
    ///
    /// An unregistered token gets exactly one registration attempt here.
    pub async fn ready_token(&self, now: DateTime<Utc>) -> Option<DeliveryToken> {
        if self.is_permission_denied().await {
            return None;
        }

        let token = self.current_token().await?;
        if token.registered {
            return Some(token);
        }

        match self.register_with_backend(now).await {
            Ok(()) => self.current_token().await.filter(|t| t.registered),
            Err(e) => {
                debug!("Token not ready for push scheduling: {e}");
                None
            }
        }
    }
}
