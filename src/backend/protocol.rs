//! # Backend Protocol
//!
//! JSON request/response bodies for the chat, intent and push endpoints.
//! Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::features::reminders::{Platform, ReminderRecord};

// ============================================================================
// Intent + chat
// ============================================================================

/// `POST /intent/classify`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    pub user_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentClassification {
    pub success: bool,
    #[serde(default)]
    pub intent: Option<String>,
    /// Normalized time expression, present for reminder intents
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

/// `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_id: String,
    pub text: String,
    pub use_web_search: bool,
    pub include_context: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub web_search_used: bool,
}

// ============================================================================
// Push delivery
// ============================================================================

/// `POST /firebase/register-device`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub fcm_token: String,
    pub platform: Platform,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

/// `POST /firebase/schedule-reminder`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleReminderRequest {
    pub reminder: ReminderRecord,
    pub fcm_token: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleReminderResponse {
    pub success: bool,
    #[serde(default)]
    pub remote_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `POST /firebase/cancel-reminder`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelReminderRequest {
    pub remote_id: String,
    pub fcm_token: String,
    pub user_id: String,
}

/// Generic `{success}` acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgement {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /firebase/reminder-status/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteReminderStatus {
    pub success: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered: Option<bool>,
}
