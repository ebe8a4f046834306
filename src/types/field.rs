//! Typed key/value fields attached to log events.

use std::time::Duration;

/// A typed key/value pair attached to a [`LogEvent`](crate::types::LogEvent).
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name.
    pub key: String,
    /// Typed value.
    pub value: FieldValue,
    /// Marks the value for redaction when rendering.
    pub sensitive: bool,
}

/// The value of a [`Field`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Boolean value
    Bool(bool),
    /// Signed integer value
    Int(i64),
    /// Unsigned integer value
    Uint(u64),
    /// Floating-point value
    Float(f64),
    /// String value
    Str(String),
    /// Elapsed-time value
    Duration(Duration),
}

impl Field {
    fn new(key: impl Into<String>, value: FieldValue) -> Self {
        Self {
            key: key.into(),
            value,
            sensitive: false,
        }
    }

    /// Boolean field.
    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, FieldValue::Bool(value))
    }

    /// Signed integer field.
    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, FieldValue::Int(value))
    }

    /// Unsigned integer field.
    pub fn uint(key: impl Into<String>, value: u64) -> Self {
        Self::new(key, FieldValue::Uint(value))
    }

    /// Floating-point field.
    pub fn float(key: impl Into<String>, value: f64) -> Self {
        Self::new(key, FieldValue::Float(value))
    }

    /// String field.
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, FieldValue::Str(value.into()))
    }

    /// Elapsed-time field, rendered in human-readable units.
    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Self::new(key, FieldValue::Duration(value))
    }

    /// Field carrying an error's display message.
    pub fn error(key: impl Into<String>, err: &dyn std::error::Error) -> Self {
        Self::new(key, FieldValue::Str(err.to_string()))
    }

    /// Mark this field's value for redaction regardless of its key.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Key substrings that trigger automatic redaction (matched case-insensitively).
const SENSITIVE_KEY_MARKERS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "auth",
    "credential",
    "credentials",
    "api_key",
    "apikey",
    "access_token",
    "accesstoken",
    "refresh_token",
    "private_key",
    "privatekey",
    "authorization",
    "key",
];

pub(crate) fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_KEY_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}
