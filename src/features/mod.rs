pub mod delivery;
pub mod intent;
pub mod reminders;
pub mod settings;

pub use delivery::{DeliveryToken, DeliveryTokenManager, PermissionProvider, TokenSource};
pub use intent::{IntentRouter, Reply, Route};
pub use reminders::{ReminderRecord, ReminderScheduler, ReminderStore};
pub use settings::Settings;
