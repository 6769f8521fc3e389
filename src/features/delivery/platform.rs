//! Configuration-driven stand-ins for the device permission system and the
//! push SDK, used where no mobile runtime is available.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use super::{PermissionProvider, PermissionStatus, TokenSource};
use crate::core::PipelineResult;

/// Answers every prompt with the same configured decision
#[derive(Debug)]
pub struct StaticPermissions {
    granted: bool,
    prompts: AtomicUsize,
}

impl StaticPermissions {
    pub fn new(granted: bool) -> Self {
        Self {
            granted,
            prompts: AtomicUsize::new(0),
        }
    }

    /// Number of prompts shown so far (both steps counted)
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    fn answer(&self, what: &str) -> PermissionStatus {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if self.granted {
            PermissionStatus::granted()
        } else {
            PermissionStatus::denied(format!("{what} permission disabled by configuration"))
        }
    }
}

#[async_trait]
impl PermissionProvider for StaticPermissions {
    async fn request_os_permission(&self) -> PermissionStatus {
        self.answer("notification")
    }

    async fn request_push_permission(&self) -> PermissionStatus {
        self.answer("push")
    }
}

/// Hands out a fixed token that can be swapped to simulate SDK rotation
#[derive(Debug, Default)]
pub struct StaticTokenSource {
    token: RwLock<Option<String>>,
}

impl StaticTokenSource {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub fn set(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn fetch_token(&self) -> PipelineResult<Option<String>> {
        Ok(self.token.read().ok().and_then(|t| t.clone()))
    }
}
