//! Console output.

use crate::sink::Sink;
use crate::Result;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Writes records to stdout or stderr.
#[derive(Debug)]
pub struct ConsoleSink {
    stream: Stream,
}

impl ConsoleSink {
    /// Sink writing to standard output.
    pub fn stdout() -> Self {
        Self {
            stream: Stream::Stdout,
        }
    }

    /// Sink writing to standard error.
    pub fn stderr() -> Self {
        Self {
            stream: Stream::Stderr,
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Sink for ConsoleSink {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        match self.stream {
            Stream::Stdout => io::stdout().lock().write_all(bytes)?,
            Stream::Stderr => io::stderr().lock().write_all(bytes)?,
        }
        Ok(bytes.len())
    }

    fn flush(&mut self) -> Result<()> {
        match self.stream {
            Stream::Stdout => io::stdout().lock().flush()?,
            Stream::Stderr => io::stderr().lock().flush()?,
        }
        Ok(())
    }
}
