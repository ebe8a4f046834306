//! Logger facade: level gating, field capture, rendering, and delivery.

use crate::config::{LoggerConfig, PipelineConfig};
use crate::format::{Formatter, TextFormatter};
use crate::pipeline::AsyncPipeline;
use crate::pool::BufferPool;
use crate::sink::{ConsoleSink, Sink};
use crate::types::{is_sensitive_key, AtomicLevel, Field, Level, LogEvent};
use crate::{Result, RingLogError};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone)]
enum Delivery {
    /// Write to the sink inline, on the caller's task.
    Direct(Arc<Mutex<Box<dyn Sink>>>),
    /// Hand rendered records to the async pipeline.
    Pipeline(AsyncPipeline),
}

struct LoggerInner {
    level: AtomicLevel,
    formatter: Arc<dyn Formatter>,
    delivery: Delivery,
    base_fields: Vec<Field>,
    redact_sensitive: bool,
    extra_sensitive_keys: Vec<String>,
    scratch: BufferPool,
}

/// Structured logger handle.
///
/// Cheap to clone; clones share the formatter, delivery target, and level
/// threshold. Build one with [`Logger::builder`] or [`Logger::from_config`].
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl Logger {
    /// Start building a logger.
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Build a logger from configuration, with the default text formatter and
    /// stdout sink.
    pub fn from_config(config: LoggerConfig) -> Result<Self> {
        Logger::builder()
            .level(config.level)
            .redact_sensitive(config.redact_sensitive)
            .pipeline_config(config.pipeline.clone())
            .async_delivery(config.async_delivery)
            .build()
    }

    /// Minimum level currently rendered.
    pub fn level(&self) -> Level {
        self.inner.level.load()
    }

    /// Change the minimum rendered level; takes effect for subsequent calls.
    pub fn set_level(&self, level: Level) {
        self.inner.level.store(level);
    }

    /// Whether a message at `level` would currently be rendered.
    pub fn enabled(&self, level: Level) -> bool {
        self.inner.level.enabled(level)
    }

    /// Log at `level` with attached fields.
    pub async fn log(&self, level: Level, message: &str, fields: Vec<Field>) -> Result<()> {
        if !self.enabled(level) {
            return Ok(());
        }

        let mut event = LogEvent::new(level, message);
        event
            .fields
            .reserve(self.inner.base_fields.len() + fields.len());
        event.fields.extend(self.inner.base_fields.iter().cloned());
        event.fields.extend(fields);
        if self.inner.redact_sensitive {
            self.mark_sensitive(&mut event);
        }

        let mut buf = self.inner.scratch.acquire();
        self.inner.formatter.render(&event, &mut buf)?;
        self.deliver(&buf).await
    }

    fn mark_sensitive(&self, event: &mut LogEvent) {
        for field in &mut event.fields {
            if field.sensitive {
                continue;
            }
            if is_sensitive_key(&field.key)
                || self
                    .inner
                    .extra_sensitive_keys
                    .iter()
                    .any(|key| field.key.eq_ignore_ascii_case(key))
            {
                field.sensitive = true;
            }
        }
    }

    async fn deliver(&self, record: &[u8]) -> Result<()> {
        match &self.inner.delivery {
            Delivery::Direct(sink) => {
                let mut sink = sink.lock();
                let written = sink.write(record)?;
                if written != record.len() {
                    return Err(RingLogError::ShortWrite {
                        written,
                        expected: record.len(),
                    });
                }
                sink.flush()
            }
            Delivery::Pipeline(pipeline) => pipeline.write(record).await,
        }
    }

    /// Log at Trace level.
    pub async fn trace<S: AsRef<str>>(&self, message: S) -> Result<()> {
        self.log(Level::Trace, message.as_ref(), Vec::new()).await
    }

    /// Log at Trace level with fields.
    pub async fn trace_with_fields<S: AsRef<str>>(
        &self,
        message: S,
        fields: Vec<Field>,
    ) -> Result<()> {
        self.log(Level::Trace, message.as_ref(), fields).await
    }

    /// Log at Debug level.
    pub async fn debug<S: AsRef<str>>(&self, message: S) -> Result<()> {
        self.log(Level::Debug, message.as_ref(), Vec::new()).await
    }

    /// Log at Debug level with fields.
    pub async fn debug_with_fields<S: AsRef<str>>(
        &self,
        message: S,
        fields: Vec<Field>,
    ) -> Result<()> {
        self.log(Level::Debug, message.as_ref(), fields).await
    }

    /// Log at Info level.
    pub async fn info<S: AsRef<str>>(&self, message: S) -> Result<()> {
        self.log(Level::Info, message.as_ref(), Vec::new()).await
    }

    /// Log at Info level with fields.
    pub async fn info_with_fields<S: AsRef<str>>(
        &self,
        message: S,
        fields: Vec<Field>,
    ) -> Result<()> {
        self.log(Level::Info, message.as_ref(), fields).await
    }

    /// Log at Warn level.
    pub async fn warn<S: AsRef<str>>(&self, message: S) -> Result<()> {
        self.log(Level::Warn, message.as_ref(), Vec::new()).await
    }

    /// Log at Warn level with fields.
    pub async fn warn_with_fields<S: AsRef<str>>(
        &self,
        message: S,
        fields: Vec<Field>,
    ) -> Result<()> {
        self.log(Level::Warn, message.as_ref(), fields).await
    }

    /// Log at Error level.
    pub async fn error<S: AsRef<str>>(&self, message: S) -> Result<()> {
        self.log(Level::Error, message.as_ref(), Vec::new()).await
    }

    /// Log at Error level with fields.
    pub async fn error_with_fields<S: AsRef<str>>(
        &self,
        message: S,
        fields: Vec<Field>,
    ) -> Result<()> {
        self.log(Level::Error, message.as_ref(), fields).await
    }

    /// Log at Fatal level. Renders and delivers like any other level; it is
    /// the caller's decision whether to abort afterwards.
    pub async fn fatal<S: AsRef<str>>(&self, message: S) -> Result<()> {
        self.log(Level::Fatal, message.as_ref(), Vec::new()).await
    }

    /// Log at Fatal level with fields.
    pub async fn fatal_with_fields<S: AsRef<str>>(
        &self,
        message: S,
        fields: Vec<Field>,
    ) -> Result<()> {
        self.log(Level::Fatal, message.as_ref(), fields).await
    }

    /// Derive a logger that attaches `fields` to every event, in addition to
    /// this logger's base fields. The child shares the delivery target but
    /// keeps its own level threshold, seeded from the parent's current one.
    pub fn with_fields(&self, fields: Vec<Field>) -> Logger {
        let mut base_fields = self.inner.base_fields.clone();
        base_fields.extend(fields);
        Logger {
            inner: Arc::new(LoggerInner {
                level: AtomicLevel::new(self.inner.level.load()),
                formatter: Arc::clone(&self.inner.formatter),
                delivery: self.inner.delivery.clone(),
                base_fields,
                redact_sensitive: self.inner.redact_sensitive,
                extra_sensitive_keys: self.inner.extra_sensitive_keys.clone(),
                scratch: BufferPool::new(),
            }),
        }
    }

    /// Pipeline metrics, when async delivery is active.
    pub fn pipeline(&self) -> Option<&AsyncPipeline> {
        match &self.inner.delivery {
            Delivery::Pipeline(pipeline) => Some(pipeline),
            Delivery::Direct(_) => None,
        }
    }

    /// Flush (and for async delivery, drain and stop) the delivery target.
    /// Idempotent. Closing an async logger makes later writes fail with
    /// [`RingLogError::Closed`](crate::RingLogError::Closed); a synchronous
    /// logger only flushes its sink and stays usable.
    pub async fn close(&self) -> Result<()> {
        match &self.inner.delivery {
            Delivery::Direct(sink) => sink.lock().flush(),
            Delivery::Pipeline(pipeline) => pipeline.close().await,
        }
    }
}

/// Builder for [`Logger`].
pub struct LoggerBuilder {
    level: Level,
    formatter: Option<Arc<dyn Formatter>>,
    sink: Option<Box<dyn Sink>>,
    base_fields: Vec<Field>,
    hostname_field: bool,
    redact_sensitive: bool,
    extra_sensitive_keys: Vec<String>,
    async_delivery: bool,
    pipeline_config: PipelineConfig,
    error_handler: Option<Box<dyn Fn(&RingLogError) + Send + Sync>>,
}

impl LoggerBuilder {
    /// Builder with defaults: Info level, text formatter, stdout sink,
    /// redaction on, synchronous delivery.
    pub fn new() -> Self {
        Self {
            level: Level::Info,
            formatter: None,
            sink: None,
            base_fields: Vec::new(),
            hostname_field: false,
            redact_sensitive: true,
            extra_sensitive_keys: Vec::new(),
            async_delivery: false,
            pipeline_config: PipelineConfig::default(),
            error_handler: None,
        }
    }

    /// Minimum level to render.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Event renderer. Defaults to [`TextFormatter`].
    pub fn formatter<F: Formatter + 'static>(mut self, formatter: F) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    /// Destination sink. Defaults to stdout.
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Attach a field to every event.
    pub fn field(mut self, field: Field) -> Self {
        self.base_fields.push(field);
        self
    }

    /// Attach several fields to every event.
    pub fn fields(mut self, fields: Vec<Field>) -> Self {
        self.base_fields.extend(fields);
        self
    }

    /// Attach a `hostname` field to every event.
    pub fn hostname(mut self, enabled: bool) -> Self {
        self.hostname_field = enabled;
        self
    }

    /// Toggle automatic redaction of sensitive-looking field keys.
    pub fn redact_sensitive(mut self, enabled: bool) -> Self {
        self.redact_sensitive = enabled;
        self
    }

    /// Additional exact key names (compared case-insensitively) to redact.
    pub fn sensitive_keys(mut self, keys: Vec<String>) -> Self {
        self.extra_sensitive_keys.extend(keys);
        self
    }

    /// Route records through the async delivery pipeline instead of writing
    /// on the caller's task.
    pub fn async_delivery(mut self, enabled: bool) -> Self {
        self.async_delivery = enabled;
        self
    }

    /// Pipeline tuning for async delivery.
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = config;
        self
    }

    /// Out-of-band handler for delivery errors observed by the consumer task.
    /// Only applies to async delivery; synchronous delivery reports errors to
    /// the caller directly.
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RingLogError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Box::new(handler));
        self
    }

    /// Validate and construct the logger.
    ///
    /// With async delivery this spawns the consumer task and must be called
    /// from within a Tokio runtime.
    pub fn build(self) -> Result<Logger> {
        let formatter = self
            .formatter
            .unwrap_or_else(|| Arc::new(TextFormatter::new()));
        let sink = self.sink.unwrap_or_else(|| Box::new(ConsoleSink::stdout()));

        let mut base_fields = self.base_fields;
        if self.hostname_field {
            let hostname = gethostname::gethostname().to_string_lossy().into_owned();
            base_fields.push(Field::string("hostname", hostname));
        }

        let delivery = if self.async_delivery {
            let pipeline = AsyncPipeline::new(self.pipeline_config, sink)?;
            if let Some(handler) = self.error_handler {
                pipeline.set_error_handler(handler);
            }
            Delivery::Pipeline(pipeline)
        } else {
            Delivery::Direct(Arc::new(Mutex::new(sink)))
        };

        Ok(Logger {
            inner: Arc::new(LoggerInner {
                level: AtomicLevel::new(self.level),
                formatter,
                delivery,
                base_fields,
                redact_sensitive: self.redact_sensitive,
                extra_sensitive_keys: self.extra_sensitive_keys,
                scratch: BufferPool::new(),
            }),
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
