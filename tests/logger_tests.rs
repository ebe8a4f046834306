//! Integration tests for the logger facade and sinks

use ringlog::config::{LoggerConfig, PipelineConfig};
use ringlog::format::{JsonFormatter, TextFormatter};
use ringlog::logger::Logger;
use ringlog::sink::{FileSink, MemorySink, MultiSink, RotationConfig};
use ringlog::types::{Field, Level};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, NamedTempFile};

/// Helper to parse one rendered JSON line
fn parse(line: &str) -> Value {
    serde_json::from_str(line).unwrap()
}

/// JSON events through the async pipeline land in a file, complete and in
/// order
#[tokio::test]
async fn test_async_json_logging_to_file() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("app.log");

    let logger = Logger::builder()
        .level(Level::Debug)
        .formatter(JsonFormatter::new())
        .sink(FileSink::new(&path).unwrap())
        .async_delivery(true)
        .build()
        .unwrap();

    for i in 0..25 {
        logger
            .info_with_fields("work item", vec![Field::int("seq", i)])
            .await
            .unwrap();
    }
    logger.close().await.unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 25);
    for (i, line) in lines.iter().enumerate() {
        let value = parse(line);
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["message"], "work item");
        assert_eq!(value["seq"], i as i64);
    }
}

/// Text rendering end to end, with redaction applied before the sink sees
/// anything
#[tokio::test]
async fn test_text_logging_with_redaction() {
    let sink = MemorySink::new();
    let logger = Logger::builder()
        .formatter(TextFormatter::new())
        .sink(sink.clone())
        .build()
        .unwrap();

    logger
        .warn_with_fields(
            "login failed",
            vec![
                Field::string("user", "alice"),
                Field::string("password", "hunter2"),
            ],
        )
        .await
        .unwrap();

    let line = &sink.lines()[0];
    assert!(line.contains("WARN login failed"));
    assert!(line.contains("password=[REDACTED]"));
    assert!(line.contains("user=alice"));
    assert!(!line.contains("hunter2"));
}

/// A config file drives the logger: level, redaction, and pipeline tuning
#[tokio::test]
async fn test_config_file_driven_logger() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
level = "Warn"
async_delivery = true
redact_sensitive = true

[pipeline]
capacity = 32
backpressure = "Block"
dynamic_resize = true
resize_threshold = 80
flush_interval_ms = 10
"#
    )
    .unwrap();
    let config = LoggerConfig::from_file(file.path()).unwrap();

    let sink = MemorySink::new();
    let logger = Logger::builder()
        .level(config.level)
        .redact_sensitive(config.redact_sensitive)
        .pipeline_config(config.pipeline.clone())
        .async_delivery(config.async_delivery)
        .formatter(JsonFormatter::new())
        .sink(sink.clone())
        .build()
        .unwrap();

    logger.info("filtered out").await.unwrap();
    logger.error("kept").await.unwrap();
    logger.close().await.unwrap();

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(parse(&lines[0])["message"], "kept");
}

/// Fan-out delivers each record to every sink
#[tokio::test]
async fn test_multi_sink_fan_out() {
    let first = MemorySink::new();
    let second = MemorySink::new();
    let logger = Logger::builder()
        .formatter(JsonFormatter::new())
        .sink(MultiSink::new().with(first.clone()).with(second.clone()))
        .build()
        .unwrap();

    logger.info("broadcast").await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first.records(), second.records());
}

/// Rotation keeps the active file under the size limit while no records are
/// lost across the set of files
#[tokio::test]
async fn test_logger_drives_file_rotation() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("rotated.log");

    let logger = Logger::builder()
        .formatter(JsonFormatter::new())
        .sink(
            FileSink::with_rotation(
                &path,
                RotationConfig {
                    max_size_bytes: 512,
                    keep_files: 10,
                    compress: false,
                },
            )
            .unwrap(),
        )
        .build()
        .unwrap();

    for i in 0..40 {
        logger
            .info_with_fields("rotation test event", vec![Field::int("seq", i)])
            .await
            .unwrap();
    }
    logger.close().await.unwrap();

    let mut total_lines = 0;
    let mut rotated_files = 0;
    for entry in fs::read_dir(temp_dir.path()).unwrap() {
        let entry_path = entry.unwrap().path();
        let content = fs::read_to_string(&entry_path).unwrap();
        total_lines += content.lines().count();
        if entry_path != path {
            rotated_files += 1;
            assert!(fs::metadata(&entry_path).unwrap().len() <= 512);
        }
    }
    assert_eq!(total_lines, 40);
    assert!(rotated_files >= 1);
}

/// Delivery errors surface through the configured handler while the caller's
/// writes keep succeeding
#[tokio::test]
async fn test_error_handler_receives_sink_failures() {
    struct BrokenSink;

    impl ringlog::sink::Sink for BrokenSink {
        fn write(&mut self, _bytes: &[u8]) -> ringlog::Result<usize> {
            Err(ringlog::RingLogError::Sink("disk gone".to_string()))
        }
    }

    let errors = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&errors);
    let logger = Logger::builder()
        .formatter(JsonFormatter::new())
        .sink(BrokenSink)
        .async_delivery(true)
        .pipeline_config(PipelineConfig {
            flush_interval_ms: 10,
            ..PipelineConfig::default()
        })
        .error_handler(move |_| {
            seen.fetch_add(1, Ordering::Relaxed);
        })
        .build()
        .unwrap();

    logger.info("doomed").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(errors.load(Ordering::Relaxed) >= 1);
    // close reports the wedged sink instead of pretending success
    assert!(logger.close().await.is_err());
}

/// Logger clones and children interleave safely on one shared pipeline
#[tokio::test]
async fn test_concurrent_loggers_share_pipeline() {
    let sink = MemorySink::new();
    let logger = Logger::builder()
        .formatter(JsonFormatter::new())
        .sink(sink.clone())
        .async_delivery(true)
        .build()
        .unwrap();

    let mut handles = Vec::new();
    for task in 0..4 {
        let logger = logger.with_fields(vec![Field::int("task", task)]);
        handles.push(tokio::spawn(async move {
            for seq in 0..25 {
                logger
                    .info_with_fields("tick", vec![Field::int("seq", seq)])
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    logger.close().await.unwrap();

    let lines = sink.lines();
    assert_eq!(lines.len(), 100);
    // per-task sequences stay in order even though tasks interleave
    for task in 0..4 {
        let seqs: Vec<i64> = lines
            .iter()
            .map(|line| parse(line))
            .filter(|value| value["task"] == task)
            .map(|value| value["seq"].as_i64().unwrap())
            .collect();
        assert_eq!(seqs, (0..25).collect::<Vec<i64>>());
    }
}
