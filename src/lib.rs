// Core layer - configuration, clock and error taxonomy
pub mod core;

// Storage layer - durable key-value substrate
pub mod storage;

// Backend layer - chat/intent and push delivery services
pub mod backend;

// Features layer - reminders, delivery, intent routing, settings
pub mod features;

#[cfg(test)]
mod testing;

pub use crate::core::{Config, PipelineError, PipelineResult};

pub use features::{
    // Delivery
    DeliveryToken, DeliveryTokenManager,
    // Intent routing
    IntentRouter, Reply, Route,
    // Reminders
    ReminderRecord, ReminderScheduler, ReminderStore,
    // Settings
    Settings,
};
