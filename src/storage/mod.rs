//! # Key-Value Storage
//!
//! Durable string-to-string substrate shared by the reminder store, the
//! delivery token cache and user settings.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Storage keys. Everything lives under `companion.` so feature toggles and
/// pipeline state never collide.
pub mod keys {
    pub const USER_ID: &str = "companion.user_id";
    pub const DELIVERY_TOKEN: &str = "companion.delivery_token";
    pub const REMINDERS: &str = "companion.reminders";
    pub const WEB_SEARCH: &str = "companion.settings.web_search";
    pub const AUTO_PLAY_AUDIO: &str = "companion.settings.auto_play_audio";
}

/// Durable key-value mapping. A successful `set`/`remove` must be visible to
/// every subsequent `get`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}
