//! Core data types: severity levels, structured fields, and log events.

pub mod event;
pub mod field;
pub mod level;

pub use event::LogEvent;
pub use field::{Field, FieldValue};
pub use level::{AtomicLevel, Level};

pub(crate) use field::is_sensitive_key;
