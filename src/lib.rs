//! # ringlog - High-Performance Structured Logging
//!
//! ringlog is a structured logging library built around an asynchronous
//! delivery pipeline: a bounded, concurrent, dynamically resizable ring buffer
//! that decouples log call sites from sink I/O. Producers reserve slots with a
//! lock-free cursor, a single background task drains records in order, and
//! saturation is handled by an explicit backpressure policy instead of
//! unbounded queueing.
//!
//! ## Features
//!
//! - **Async delivery**: lock-free slot reservation, sharded payload locks,
//!   one consumer task flushing on an interval and at shutdown
//! - **Backpressure**: drop-with-counter or bounded blocking with jittered
//!   exponential backoff; writes never stall forever
//! - **Dynamic growth**: the ring doubles (up to a cap) when utilization
//!   crosses a threshold, without renumbering in-flight records
//! - **Structured events**: typed fields with sensitive-value redaction
//! - **Pluggable rendering and output**: JSON and text formatters; console,
//!   rotating-file, fan-out, and in-memory sinks
//!
//! ## Quick Start
//!
//! ```no_run
//! use ringlog::format::JsonFormatter;
//! use ringlog::logger::Logger;
//! use ringlog::sink::FileSink;
//! use ringlog::types::{Field, Level};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let logger = Logger::builder()
//!         .level(Level::Info)
//!         .formatter(JsonFormatter::new())
//!         .sink(FileSink::new("app.log")?)
//!         .async_delivery(true)
//!         .build()?;
//!
//!     logger.info("service started").await?;
//!     logger
//!         .info_with_fields("user logged in", vec![Field::string("user", "alice")])
//!         .await?;
//!
//!     logger.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! The pipeline can also be driven directly with pre-rendered records:
//!
//! ```no_run
//! use ringlog::config::PipelineConfig;
//! use ringlog::pipeline::AsyncPipeline;
//! use ringlog::sink::MemorySink;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sink = MemorySink::new();
//!     let pipeline = AsyncPipeline::new(PipelineConfig::default(), Box::new(sink.clone()))?;
//!     pipeline.write(b"{\"message\":\"hello\"}\n").await?;
//!     pipeline.close().await?;
//!     assert_eq!(sink.len(), 1);
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod format;
pub mod logger;
pub mod pipeline;
pub(crate) mod pool;
pub mod sink;
pub mod types;

/// Common error types used throughout ringlog
pub mod error {
    use std::fmt;

    /// ringlog error types
    #[derive(Debug)]
    pub enum RingLogError {
        /// I/O operation failed
        Io(std::io::Error),
        /// Scalar serialization failed while rendering an event
        Serde(serde_json::Error),
        /// Admission failed because the ring was full
        BufferFull,
        /// The pipeline or logger was already closed
        Closed,
        /// The sink accepted fewer bytes than offered
        ShortWrite {
            /// Bytes the sink accepted.
            written: usize,
            /// Bytes offered.
            expected: usize,
        },
        /// Configuration error
        Config(String),
        /// Sink failure that is not an I/O error
        Sink(String),
        /// Pipeline lifecycle error
        Pipeline(String),
    }

    impl fmt::Display for RingLogError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                RingLogError::Io(e) => write!(f, "I/O error: {}", e),
                RingLogError::Serde(e) => write!(f, "Serialization error: {}", e),
                RingLogError::BufferFull => write!(f, "Ring buffer full"),
                RingLogError::Closed => write!(f, "Logger closed"),
                RingLogError::ShortWrite { written, expected } => {
                    write!(f, "Short write: {} of {} bytes", written, expected)
                }
                RingLogError::Config(e) => write!(f, "Configuration error: {}", e),
                RingLogError::Sink(e) => write!(f, "Sink error: {}", e),
                RingLogError::Pipeline(e) => write!(f, "Pipeline error: {}", e),
            }
        }
    }

    impl std::error::Error for RingLogError {}

    impl From<std::io::Error> for RingLogError {
        fn from(err: std::io::Error) -> Self {
            RingLogError::Io(err)
        }
    }

    impl From<serde_json::Error> for RingLogError {
        fn from(err: serde_json::Error) -> Self {
            RingLogError::Serde(err)
        }
    }

    impl RingLogError {
        /// Whether this error is an admission failure.
        pub fn is_buffer_full(&self) -> bool {
            matches!(self, RingLogError::BufferFull)
        }

        /// Whether this error reports use after close.
        pub fn is_closed(&self) -> bool {
            matches!(self, RingLogError::Closed)
        }
    }

    /// Result type alias for ringlog operations
    pub type Result<T> = std::result::Result<T, RingLogError>;
}

pub use error::{Result, RingLogError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{LoggerConfig, PipelineConfig};
    pub use crate::format::{FormatOptions, Formatter, JsonFormatter, TextFormatter};
    pub use crate::logger::{Logger, LoggerBuilder};
    pub use crate::pipeline::{AsyncPipeline, BackpressureMode};
    pub use crate::sink::{ConsoleSink, FileSink, MemorySink, MultiSink, RotationConfig, Sink};
    pub use crate::types::{Field, FieldValue, Level, LogEvent};
    pub use crate::{Result, RingLogError};
}
