//! Human-readable text rendering.

use crate::format::{FormatOptions, Formatter};
use crate::types::{Field, FieldValue, LogEvent};
use crate::Result;

/// Formats events as `TIMESTAMP LEVEL message key=value ...`.
///
/// Values containing whitespace, quotes, or `=` are double-quoted with
/// backslash escaping.
#[derive(Debug, Clone)]
pub struct TextFormatter {
    /// Rendering options.
    pub options: FormatOptions,
    /// Separator between the header parts and between fields.
    pub field_separator: String,
    /// Prefix each value with `key=`.
    pub include_field_names: bool,
    /// Sort fields by key instead of keeping attachment order.
    pub sort_fields: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            options: FormatOptions::default(),
            field_separator: " ".to_string(),
            include_field_names: true,
            sort_fields: true,
        }
    }
}

impl TextFormatter {
    /// Formatter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatter with the given options.
    pub fn with_options(options: FormatOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }
}

impl Formatter for TextFormatter {
    fn render(&self, event: &LogEvent, buf: &mut Vec<u8>) -> Result<()> {
        let separator = self.field_separator.as_bytes();
        if self.options.include_timestamp {
            let timestamp = event
                .timestamp
                .format(&self.options.timestamp_format)
                .to_string();
            buf.extend_from_slice(timestamp.as_bytes());
            buf.extend_from_slice(separator);
        }
        if self.options.include_level {
            buf.extend_from_slice(event.level.as_str().as_bytes());
            buf.extend_from_slice(separator);
        }
        buf.extend_from_slice(event.message.as_bytes());

        let mut fields: Vec<&Field> = event.fields.iter().collect();
        if self.sort_fields {
            fields.sort_by(|a, b| a.key.cmp(&b.key));
        }
        for field in fields {
            buf.extend_from_slice(separator);
            if self.include_field_names {
                buf.extend_from_slice(field.key.as_bytes());
                buf.push(b'=');
            }
            let rendered = if field.sensitive {
                self.options.redacted_value.clone()
            } else {
                value_text(&field.value)
            };
            push_maybe_quoted(buf, &rendered);
        }
        if self.options.trailing_newline {
            buf.push(b'\n');
        }
        Ok(())
    }
}

fn value_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Bool(v) => v.to_string(),
        FieldValue::Int(v) => v.to_string(),
        FieldValue::Uint(v) => v.to_string(),
        FieldValue::Float(v) => v.to_string(),
        FieldValue::Str(v) => v.clone(),
        FieldValue::Duration(v) => format!("{:?}", v),
    }
}

fn push_maybe_quoted(buf: &mut Vec<u8>, value: &str) {
    let needs_quoting = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '=');
    if !needs_quoting {
        buf.extend_from_slice(value.as_bytes());
        return;
    }
    buf.push(b'"');
    for byte in value.bytes() {
        if byte == b'"' || byte == b'\\' {
            buf.push(b'\\');
        }
        buf.push(byte);
    }
    buf.push(b'"');
}
