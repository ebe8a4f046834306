//! JSON rendering: one object per line, keys in insertion order.

use crate::format::{FormatOptions, Formatter};
use crate::types::{FieldValue, LogEvent};
use crate::Result;

/// Formats events as single-line JSON objects.
///
/// Keys appear in a fixed order: timestamp, level, message, then fields in
/// attachment order. Strings are escaped with `serde_json`; the object shell
/// is assembled by hand so field order survives.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    /// Rendering options.
    pub options: FormatOptions,
}

impl JsonFormatter {
    /// Formatter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatter with the given options.
    pub fn with_options(options: FormatOptions) -> Self {
        Self { options }
    }
}

impl Formatter for JsonFormatter {
    fn render(&self, event: &LogEvent, buf: &mut Vec<u8>) -> Result<()> {
        let mut first = true;
        buf.push(b'{');
        if self.options.include_timestamp {
            let timestamp = event
                .timestamp
                .format(&self.options.timestamp_format)
                .to_string();
            write_key(buf, &self.options.time_key, &mut first)?;
            serde_json::to_writer(&mut *buf, &timestamp)?;
        }
        if self.options.include_level {
            write_key(buf, &self.options.level_key, &mut first)?;
            serde_json::to_writer(&mut *buf, event.level.as_str())?;
        }
        write_key(buf, &self.options.message_key, &mut first)?;
        serde_json::to_writer(&mut *buf, &event.message)?;
        for field in &event.fields {
            write_key(buf, &field.key, &mut first)?;
            if field.sensitive {
                serde_json::to_writer(&mut *buf, &self.options.redacted_value)?;
            } else {
                write_value(buf, &field.value)?;
            }
        }
        buf.push(b'}');
        if self.options.trailing_newline {
            buf.push(b'\n');
        }
        Ok(())
    }
}

fn write_key(buf: &mut Vec<u8>, key: &str, first: &mut bool) -> Result<()> {
    if !*first {
        buf.push(b',');
    }
    *first = false;
    serde_json::to_writer(&mut *buf, key)?;
    buf.push(b':');
    Ok(())
}

fn write_value(buf: &mut Vec<u8>, value: &FieldValue) -> Result<()> {
    match value {
        FieldValue::Bool(v) => serde_json::to_writer(&mut *buf, v)?,
        FieldValue::Int(v) => serde_json::to_writer(&mut *buf, v)?,
        FieldValue::Uint(v) => serde_json::to_writer(&mut *buf, v)?,
        FieldValue::Float(v) => serde_json::to_writer(&mut *buf, v)?,
        FieldValue::Str(v) => serde_json::to_writer(&mut *buf, v)?,
        FieldValue::Duration(v) => serde_json::to_writer(&mut *buf, &format!("{:?}", v))?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, Level};
    use serde_json::Value;

    fn render_to_value(formatter: &JsonFormatter, event: &LogEvent) -> Value {
        let mut buf = Vec::new();
        formatter.render(event, &mut buf).unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    #[test]
    fn test_basic_object() {
        let formatter = JsonFormatter::new();
        let event = LogEvent::new(Level::Info, "hello");
        let value = render_to_value(&formatter, &event);

        assert_eq!(value["level"], "INFO");
        assert_eq!(value["message"], "hello");
        assert!(value["time"].is_string());
    }

    #[test]
    fn test_field_types() {
        let formatter = JsonFormatter::new();
        let event = LogEvent::with_fields(
            Level::Debug,
            "typed",
            vec![
                Field::bool("ok", true),
                Field::int("delta", -4),
                Field::uint("count", 9),
                Field::float("ratio", 0.5),
                Field::string("name", "db"),
            ],
        );
        let value = render_to_value(&formatter, &event);

        assert_eq!(value["ok"], true);
        assert_eq!(value["delta"], -4);
        assert_eq!(value["count"], 9);
        assert_eq!(value["ratio"], 0.5);
        assert_eq!(value["name"], "db");
    }

    #[test]
    fn test_key_order_is_stable() {
        let formatter = JsonFormatter::new();
        let event = LogEvent::with_fields(
            Level::Info,
            "ordered",
            vec![Field::int("z", 1), Field::int("a", 2)],
        );
        let mut buf = Vec::new();
        formatter.render(&event, &mut buf).unwrap();
        let line = String::from_utf8(buf).unwrap();

        let time_pos = line.find("\"time\"").unwrap();
        let level_pos = line.find("\"level\"").unwrap();
        let message_pos = line.find("\"message\"").unwrap();
        let z_pos = line.find("\"z\"").unwrap();
        let a_pos = line.find("\"a\"").unwrap();
        assert!(time_pos < level_pos && level_pos < message_pos);
        assert!(message_pos < z_pos && z_pos < a_pos);
    }

    #[test]
    fn test_sensitive_fields_redacted() {
        let formatter = JsonFormatter::new();
        let event = LogEvent::with_fields(
            Level::Info,
            "login",
            vec![Field::string("password", "hunter2").sensitive()],
        );
        let value = render_to_value(&formatter, &event);
        assert_eq!(value["password"], "[REDACTED]");
    }

    #[test]
    fn test_message_escaping() {
        let formatter = JsonFormatter::new();
        let event = LogEvent::new(Level::Info, "line\nbreak \"quoted\"");
        let value = render_to_value(&formatter, &event);
        assert_eq!(value["message"], "line\nbreak \"quoted\"");
    }

    #[test]
    fn test_trailing_newline() {
        let formatter = JsonFormatter::new();
        let event = LogEvent::new(Level::Info, "x");
        let mut buf = Vec::new();
        formatter.render(&event, &mut buf).unwrap();
        assert_eq!(buf.last(), Some(&b'\n'));
    }

    #[test]
    fn test_options_disable_header_keys() {
        let formatter = JsonFormatter::with_options(FormatOptions {
            include_timestamp: false,
            include_level: false,
            ..FormatOptions::default()
        });
        let event = LogEvent::new(Level::Info, "bare");
        let value = render_to_value(&formatter, &event);
        assert!(value.get("time").is_none());
        assert!(value.get("level").is_none());
        assert_eq!(value["message"], "bare");
    }
}
