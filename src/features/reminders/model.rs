//! Reminder record and delivery state
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Patches cannot move a reminder to or before its creation
//! - 1.1.0: Delivery fields can only change together through `DeliveryState`
//! - 1.0.0: Initial record shape

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{PipelineError, PipelineResult};

/// Owner used when no user id has been stored yet
pub const DEFAULT_USER_ID: &str = "default_user";

/// Device platform the reminder was created on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Other,
}

impl Platform {
    /// iOS and recent Android ask for OS permission and push-service permission separately
    pub fn requires_two_step_permission(&self) -> bool {
        matches!(self, Platform::Android | Platform::Ios)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Android => write!(f, "android"),
            Platform::Ios => write!(f, "ios"),
            Platform::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "other" => Ok(Platform::Other),
            _ => Err(anyhow::anyhow!("Invalid platform: {}", s)),
        }
    }
}

/// How a reminder will reach the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    None,
    Push,
    LocalOnly,
}

impl std::fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMethod::None => write!(f, "none"),
            DeliveryMethod::Push => write!(f, "push"),
            DeliveryMethod::LocalOnly => write!(f, "local_only"),
        }
    }
}

/// The only way delivery fields are written. Each variant maps to exactly one
/// valid `(scheduled, method, remote_id)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryState {
    /// Persisted, no delivery path confirmed yet
    Pending,
    /// Accepted by the push backend
    Pushed { remote_id: String },
    /// Kept on device only (degraded mode)
    LocalOnly,
}

/// A persisted reminder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRecord {
    /// Empty until the store assigns one
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub original_text: String,
    pub time: DateTime<Utc>,
    pub confidence: f64,
    pub platform: Platform,
    pub created: DateTime<Utc>,
    pub scheduled: bool,
    pub method: DeliveryMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

impl ReminderRecord {
    /// New pending record. `confidence` is clamped into [0, 1].
    pub fn new(
        user_id: impl Into<String>,
        text: impl Into<String>,
        original_text: impl Into<String>,
        time: DateTime<Utc>,
        confidence: f64,
        platform: Platform,
        created: DateTime<Utc>,
    ) -> Self {
        let user_id = user_id.into();
        Self {
            id: String::new(),
            user_id: if user_id.trim().is_empty() {
                DEFAULT_USER_ID.to_string()
            } else {
                user_id
            },
            text: text.into(),
            original_text: original_text.into(),
            time,
            confidence: if confidence.is_nan() {
                0.0
            } else {
                confidence.clamp(0.0, 1.0)
            },
            platform,
            created,
            scheduled: false,
            method: DeliveryMethod::None,
            remote_id: None,
        }
    }

    pub fn delivery_state(&self) -> DeliveryState {
        match (&self.method, &self.remote_id) {
            (DeliveryMethod::Push, Some(remote_id)) if self.scheduled => DeliveryState::Pushed {
                remote_id: remote_id.clone(),
            },
            (DeliveryMethod::LocalOnly, _) => DeliveryState::LocalOnly,
            _ => DeliveryState::Pending,
        }
    }

    pub fn apply_delivery(&mut self, state: DeliveryState) {
        match state {
            DeliveryState::Pending => {
                self.scheduled = false;
                self.method = DeliveryMethod::None;
                self.remote_id = None;
            }
            DeliveryState::Pushed { remote_id } => {
                self.scheduled = true;
                self.method = DeliveryMethod::Push;
                self.remote_id = Some(remote_id);
            }
            DeliveryState::LocalOnly => {
                self.scheduled = false;
                self.method = DeliveryMethod::LocalOnly;
                self.remote_id = None;
            }
        }
    }

    /// Whether the target instant has passed at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.time <= now
    }
}

/// Partial update accepted by `ReminderStore::update`
#[derive(Debug, Clone, Default)]
pub struct ReminderPatch {
    pub text: Option<String>,
    pub time: Option<DateTime<Utc>>,
    pub delivery: Option<DeliveryState>,
}

impl ReminderPatch {
    pub fn delivery(state: DeliveryState) -> Self {
        Self {
            delivery: Some(state),
            ..Self::default()
        }
    }

    /// Apply to `record`, leaving it untouched if the new time is not after `created`
    pub(crate) fn apply_to(self, record: &mut ReminderRecord) -> PipelineResult<()> {
        if let Some(time) = self.time {
            if time <= record.created {
                return Err(PipelineError::invalid_time(format!(
                    "{time} is not after the reminder's creation at {}",
                    record.created
                )));
            }
        }

        if let Some(text) = self.text {
            record.text = text;
        }
        if let Some(time) = self.time {
            record.time = time;
        }
        if let Some(state) = self.delivery {
            record.apply_delivery(state);
        }
        Ok(())
    }
}
