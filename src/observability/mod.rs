//! Observability for flowstate
//!
//! This module provides:
//! - Structured logging (JSON lines)
//! - Typed store events
//! - Per-instance counters
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on store state
//! 3. No background threads
//! 4. Logging failures never reach the caller

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity, LOG_LEVEL_ENV};
pub use metrics::{MetricsSnapshot, StoreMetrics};

/// Log a store event at its natural severity.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
