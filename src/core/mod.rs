//! # Core Module
//!
//! Configuration, clock and error taxonomy shared by every feature.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Added clock and error modules for the reminder pipeline
//! - 1.0.0: Initial creation with config module

pub mod clock;
pub mod config;
pub mod error;

// Re-export commonly used items
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::{PipelineError, PipelineResult};
