//! Log severity levels.

use crate::{Result, RingLogError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Log severity, ordered from most to least verbose.
///
/// `Off` is not a message level; setting it as a logger threshold suppresses
/// all output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Level {
    /// Fine-grained tracing for debugging hot paths
    Trace,
    /// Diagnostic information useful during development
    Debug,
    /// Normal operational messages
    #[default]
    Info,
    /// Something unexpected that the program can tolerate
    Warn,
    /// An operation failed
    Error,
    /// A failure severe enough that the caller will likely abort
    Fatal,
    /// Threshold value that disables all logging
    Off,
}

impl Level {
    /// Upper-case name used by the formatters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::Off => "OFF",
        }
    }

    fn from_u8(value: u8) -> Level {
        match value {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            5 => Level::Fatal,
            _ => Level::Off,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = RingLogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            "off" | "disabled" => Ok(Level::Off),
            _ => Err(RingLogError::Config(format!("unknown log level: {}", s))),
        }
    }
}

/// A [`Level`] that can be read and changed concurrently without locking.
#[derive(Debug)]
pub struct AtomicLevel(AtomicU8);

impl AtomicLevel {
    /// Create with an initial threshold.
    pub fn new(level: Level) -> Self {
        Self(AtomicU8::new(level as u8))
    }

    /// Current threshold.
    pub fn load(&self) -> Level {
        Level::from_u8(self.0.load(Ordering::Relaxed))
    }

    /// Replace the threshold; takes effect for subsequent log calls.
    pub fn store(&self, level: Level) {
        self.0.store(level as u8, Ordering::Relaxed);
    }

    /// Whether a message at `level` passes the current threshold.
    pub fn enabled(&self, level: Level) -> bool {
        level != Level::Off && level >= self.load()
    }
}
