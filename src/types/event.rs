//! Structured log events.

use crate::types::{Field, Level};
use chrono::{DateTime, Utc};

/// A single structured log event, captured before rendering.
#[derive(Debug, Clone)]
pub struct LogEvent {
    /// Event creation time (UTC).
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: Level,
    /// Primary message.
    pub message: String,
    /// Structured fields, in attachment order.
    pub fields: Vec<Field>,
}

impl LogEvent {
    /// Create an event stamped with the current time.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Create an event with fields attached.
    pub fn with_fields(level: Level, message: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            fields,
        }
    }
}
