//! # Feature: Intent Routing
//!
//! Decides per utterance whether to schedule a reminder or hand off to chat.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod router;

pub use router::{IntentRouter, Reply, Route, CONFIDENCE_THRESHOLD, REMINDER_INTENT};
