//! # Feature: Push Delivery
//!
//! Device push-token lifecycle: permission prompts, token acquisition,
//! caching, refresh handling and registration with the push backend.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Generation guard so stale registrations never mark a refreshed token
//! - 1.0.0: Initial release

pub mod platform;
pub mod token;

use async_trait::async_trait;

use crate::core::PipelineResult;

pub use platform::{StaticPermissions, StaticTokenSource};
pub use token::{DeliveryToken, DeliveryTokenManager};

/// Outcome of a permission prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionStatus {
    pub granted: bool,
    pub reason: Option<String>,
}

impl PermissionStatus {
    pub fn granted() -> Self {
        Self {
            granted: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            granted: false,
            reason: Some(reason.into()),
        }
    }
}

/// Device notification permission system
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// OS-level notification permission
    async fn request_os_permission(&self) -> PermissionStatus;

    /// Push-service permission (second step on mobile platforms)
    async fn request_push_permission(&self) -> PermissionStatus;
}

/// Push SDK handing out device tokens
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// `Ok(None)` when the SDK has no token to give right now
    async fn fetch_token(&self) -> PipelineResult<Option<String>>;
}
