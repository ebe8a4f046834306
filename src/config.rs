//! Configuration for the logger and its delivery pipeline.

use crate::pipeline::BackpressureMode;
use crate::types::Level;
use crate::{Result, RingLogError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tuning for the asynchronous delivery pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Initial ring capacity in records; rounded up to a power of two and
    /// capped at 1,048,576 slots.
    pub capacity: u64,
    /// Policy applied when the ring is saturated.
    pub backpressure: BackpressureMode,
    /// Grow the ring when utilization crosses `resize_threshold`.
    pub dynamic_resize: bool,
    /// Utilization percentage (0-100) above which the ring doubles.
    pub resize_threshold: u8,
    /// Consumer wake interval in milliseconds.
    pub flush_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: 8192,
            backpressure: BackpressureMode::Drop,
            dynamic_resize: true,
            resize_threshold: 75,
            flush_interval_ms: 100,
        }
    }
}

impl PipelineConfig {
    /// Check bounds.
    pub fn validate(&self) -> Result<()> {
        if self.resize_threshold > 100 {
            return Err(RingLogError::Config(format!(
                "resize_threshold must be 0-100, got {}",
                self.resize_threshold
            )));
        }
        if self.flush_interval_ms == 0 {
            return Err(RingLogError::Config(
                "flush_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for a [`Logger`](crate::logger::Logger).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Minimum level rendered.
    pub level: Level,
    /// Route records through the async pipeline instead of writing inline.
    pub async_delivery: bool,
    /// Redact fields whose keys look sensitive.
    pub redact_sensitive: bool,
    /// Pipeline tuning, used when `async_delivery` is set.
    pub pipeline: PipelineConfig,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            async_delivery: false,
            redact_sensitive: true,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl LoggerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RingLogError::Config(format!("failed to read config file: {}", e)))?;
        let config: LoggerConfig = toml::from_str(&content)
            .map_err(|e| RingLogError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check bounds.
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::default();
        assert_eq!(config.level, Level::Info);
        assert!(!config.async_delivery);
        assert!(config.redact_sensitive);
        assert_eq!(config.pipeline.capacity, 8192);
        assert_eq!(config.pipeline.backpressure, BackpressureMode::Drop);
        assert!(config.pipeline.dynamic_resize);
        assert_eq!(config.pipeline.resize_threshold, 75);
        assert_eq!(config.pipeline.flush_interval_ms, 100);
        config.validate().unwrap();
    }

    #[test]
    fn test_threshold_bounds() {
        let mut config = PipelineConfig {
            resize_threshold: 100,
            ..PipelineConfig::default()
        };
        config.validate().unwrap();

        config.resize_threshold = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_flush_interval_rejected() {
        let config = PipelineConfig {
            flush_interval_ms: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
level = "Debug"
async_delivery = true
redact_sensitive = false

[pipeline]
capacity = 1024
backpressure = "Block"
dynamic_resize = false
resize_threshold = 90
flush_interval_ms = 50
"#
        )
        .unwrap();

        let config = LoggerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.level, Level::Debug);
        assert!(config.async_delivery);
        assert!(!config.redact_sensitive);
        assert_eq!(config.pipeline.capacity, 1024);
        assert_eq!(config.pipeline.backpressure, BackpressureMode::Block);
        assert_eq!(config.pipeline.resize_threshold, 90);
    }

    #[test]
    fn test_invalid_file_contents() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "level = 42").unwrap();

        let err = LoggerConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, RingLogError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = LoggerConfig::from_file("/nonexistent/ringlog.toml").unwrap_err();
        assert!(matches!(err, RingLogError::Config(_)));
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let config = LoggerConfig::default();
        let rendered = toml::to_string(&config).unwrap();
        let parsed: LoggerConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.level, config.level);
        assert_eq!(parsed.pipeline.capacity, config.pipeline.capacity);
    }
}
