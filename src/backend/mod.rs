//! # Backend Layer
//!
//! Collaborator contracts for the chat/intent service and the push delivery
//! service, plus the HTTP client that implements them.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod client;
pub mod protocol;

use async_trait::async_trait;

use crate::core::PipelineResult;

pub use client::BackendClient;
pub use protocol::{
    Acknowledgement, CancelReminderRequest, ChatRequest, ChatResponse, ClassifyRequest,
    IntentClassification, RegisterDeviceRequest, RemoteReminderStatus, ScheduleReminderRequest,
    ScheduleReminderResponse,
};

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, user_id: &str, text: &str) -> PipelineResult<IntentClassification>;
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> PipelineResult<ChatResponse>;
}

/// Remote push delivery. Every failure is a `PipelineError::Backend`.
#[async_trait]
pub trait PushBackend: Send + Sync {
    async fn register_device(&self, request: &RegisterDeviceRequest) -> PipelineResult<()>;

    /// Returns the backend's identifier for the scheduled notification
    async fn schedule_reminder(&self, request: &ScheduleReminderRequest) -> PipelineResult<String>;

    async fn cancel_reminder(&self, request: &CancelReminderRequest) -> PipelineResult<()>;

    async fn reminder_status(&self, remote_id: &str) -> PipelineResult<RemoteReminderStatus>;
}
