//! Log event rendering.

pub mod json;
pub mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::types::LogEvent;
use crate::Result;

/// Renders a [`LogEvent`] into bytes.
///
/// Implementations append to `buf` without clearing it and must produce the
/// same output for the same event and options.
pub trait Formatter: Send + Sync {
    /// Append the rendered form of `event` to `buf`.
    fn render(&self, event: &LogEvent, buf: &mut Vec<u8>) -> Result<()>;
}

/// Options shared by the built-in formatters.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Key used for the timestamp entry.
    pub time_key: String,
    /// Key used for the level entry.
    pub level_key: String,
    /// Key used for the message entry.
    pub message_key: String,
    /// chrono format string for timestamps.
    pub timestamp_format: String,
    /// Include the timestamp in output.
    pub include_timestamp: bool,
    /// Include the level in output.
    pub include_level: bool,
    /// Placeholder rendered in place of sensitive values.
    pub redacted_value: String,
    /// Terminate each rendered event with a newline.
    pub trailing_newline: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            time_key: "time".to_string(),
            level_key: "level".to_string(),
            message_key: "message".to_string(),
            timestamp_format: "%Y-%m-%dT%H:%M:%S%.3fZ".to_string(),
            include_timestamp: true,
            include_level: true,
            redacted_value: "[REDACTED]".to_string(),
            trailing_newline: true,
        }
    }
}
