//! Error taxonomy for the reminder pipeline
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Added `user_message` so every failure has a distinct user-facing line
//! - 1.0.0: Initial taxonomy

use thiserror::Error;

use crate::features::reminders::parser::ParseFailure;

/// Errors surfaced by the reminder pipeline.
///
/// Only [`PipelineError::Storage`] is allowed to abort a scheduling operation;
/// everything else degrades to the next-lower-capability path.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Time expression could not be parsed, or resolved to a non-future instant
    #[error("invalid reminder time: {0}")]
    InvalidTime(String),

    /// Notification permission refused; terminal for the push path this session
    #[error("notification permission denied: {0}")]
    PermissionDenied(String),

    /// No push token could be obtained right now
    #[error("delivery token unavailable: {0}")]
    TokenUnavailable(String),

    /// Network failure, timeout, non-2xx, or `success: false` from the backend
    #[error("backend error: {0}")]
    Backend(String),

    /// Referenced reminder id does not exist (or was evicted)
    #[error("reminder not found: {0}")]
    NotFound(String),

    /// Key-value substrate failed; the durability checkpoint cannot be honoured
    #[error("storage error: {0}")]
    Storage(String),
}

impl PipelineError {
    pub fn invalid_time<S: Into<String>>(msg: S) -> Self {
        PipelineError::InvalidTime(msg.into())
    }

    pub fn backend<S: Into<String>>(msg: S) -> Self {
        PipelineError::Backend(msg.into())
    }

    pub fn not_found<S: Into<String>>(id: S) -> Self {
        PipelineError::NotFound(id.into())
    }

    pub fn storage<S: Into<String>>(msg: S) -> Self {
        PipelineError::Storage(msg.into())
    }

    /// Message suitable for showing to the person who asked for the reminder
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::InvalidTime(reason) => {
                format!("I couldn't work out when to remind you ({reason}). Try something like \"in 10 minutes\" or \"at 3:30 PM\".")
            }
            PipelineError::PermissionDenied(_) => {
                "Notifications are turned off for this app. Enable them in system settings to get push reminders.".to_string()
            }
            PipelineError::TokenUnavailable(_) => {
                "Push notifications aren't ready yet. Your reminder will be kept on this device.".to_string()
            }
            PipelineError::Backend(_) => {
                "The reminder service couldn't be reached. Please try again in a moment.".to_string()
            }
            PipelineError::NotFound(id) => format!("No reminder with id {id} was found."),
            PipelineError::Storage(_) => {
                "Your reminder could not be saved on this device.".to_string()
            }
        }
    }
}

impl From<ParseFailure> for PipelineError {
    fn from(failure: ParseFailure) -> Self {
        PipelineError::InvalidTime(failure.to_string())
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            PipelineError::Backend(format!("request timed out: {error}"))
        } else {
            PipelineError::Backend(error.to_string())
        }
    }
}

/// Result alias used across the pipeline
pub type PipelineResult<T> = Result<T, PipelineError>;
