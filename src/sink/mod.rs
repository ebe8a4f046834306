//! Byte destinations for rendered log records.

pub mod console;
pub mod file;

pub use console::ConsoleSink;
pub use file::{FileSink, RotationConfig};

use crate::{Result, RingLogError};
use parking_lot::Mutex;
use std::sync::Arc;

/// A destination for rendered log records.
///
/// `write` reports how many bytes were accepted; accepting fewer than offered
/// is treated by the delivery pipeline as a short write and the record is
/// retried. Implementations must remain usable after returning an error.
pub trait Sink: Send {
    /// Write one rendered record, returning the number of bytes accepted.
    fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Flush buffered bytes to the destination.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Fans each record out to several sinks in order.
///
/// The first failing sink aborts the write; earlier sinks keep the record,
/// later ones have not seen it yet.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn Sink>>,
}

impl MultiSink {
    /// Empty fan-out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a destination.
    pub fn push<S: Sink + 'static>(&mut self, sink: S) {
        self.sinks.push(Box::new(sink));
    }

    /// Add a destination, builder style.
    pub fn with<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.push(sink);
        self
    }
}

impl Sink for MultiSink {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        for sink in &mut self.sinks {
            let written = sink.write(bytes)?;
            if written != bytes.len() {
                return Err(RingLogError::ShortWrite {
                    written,
                    expected: bytes.len(),
                });
            }
        }
        Ok(bytes.len())
    }

    fn flush(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

/// Captures records in memory. Clones share the same storage, so a clone kept
/// by the caller observes everything the pipeline delivered.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MemorySink {
    /// Empty capture sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured records, in delivery order.
    pub fn records(&self) -> Vec<Vec<u8>> {
        self.records.lock().clone()
    }

    /// Captured records decoded as UTF-8 lines, trailing newlines stripped.
    pub fn lines(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|record| {
                String::from_utf8_lossy(record)
                    .trim_end_matches('\n')
                    .to_string()
            })
            .collect()
    }

    /// Number of captured records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been captured yet.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Discard all captured records.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Sink for MemorySink {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        self.records.lock().push(bytes.to_vec());
        Ok(bytes.len())
    }
}
