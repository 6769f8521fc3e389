//! # Feature: Reminders
//!
//! Natural-language reminders: time parsing, durable local storage and
//! push scheduling with a local-only fallback.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.2.0: Late push acceptances reconciled after timeouts
//! - 1.1.0: Delivery state modelled as one value
//! - 1.0.0: Initial release

pub mod model;
pub mod parser;
pub mod scheduler;
pub mod store;

pub use model::{
    DeliveryMethod, DeliveryState, Platform, ReminderPatch, ReminderRecord, DEFAULT_USER_ID,
};
pub use parser::{parse_time_expression, reminder_text, ParseFailure};
pub use scheduler::{
    CancelResult, ReminderScheduler, ReminderStatusReport, SchedulingOutcome, SchedulingResult,
};
pub use store::ReminderStore;
