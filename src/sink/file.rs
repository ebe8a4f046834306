//! Append-mode file output with size-based rotation.

use crate::sink::Sink;
use crate::Result;
use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Rotation policy for a [`FileSink`].
#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// Rotate once the active file would exceed this many bytes.
    pub max_size_bytes: u64,
    /// Rotated files to keep; older ones are deleted.
    pub keep_files: usize,
    /// Compress rotated files with gzip. Requires the `compression` feature;
    /// ignored when it is disabled.
    pub compress: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 100 * 1024 * 1024,
            keep_files: 7,
            compress: false,
        }
    }
}

/// Writes records to a file, optionally rotating it by size.
///
/// Rotation renames the active file to `<name>.<timestamp>` and reopens a
/// fresh one; the timestamp is nanosecond-resolution so rotated names sort
/// chronologically.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: File,
    written: u64,
    rotation: Option<RotationConfig>,
}

impl FileSink {
    /// Open (or create) `path` for appending, without rotation.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path.as_ref(), None)
    }

    /// Open (or create) `path` for appending with size-based rotation.
    pub fn with_rotation(path: impl AsRef<Path>, rotation: RotationConfig) -> Result<Self> {
        Self::open(path.as_ref(), Some(rotation))
    }

    fn open(path: &Path, rotation: Option<RotationConfig>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            written,
            rotation,
        })
    }

    /// Path of the active log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written to the active file so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn rotate(&mut self) -> Result<()> {
        let Some(config) = self.rotation.clone() else {
            return Ok(());
        };
        self.file.flush()?;

        let timestamp = Utc::now().format("%Y%m%d%H%M%S%.9f");
        let rotated = self.path.with_file_name(format!(
            "{}.{}",
            self.path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| "log".to_string()),
            timestamp
        ));
        fs::rename(&self.path, &rotated)?;

        #[cfg(feature = "compression")]
        if config.compress {
            compress_rotated(&rotated)?;
        }

        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.written = 0;
        self.cleanup_old(config.keep_files)?;
        Ok(())
    }

    fn cleanup_old(&self, keep: usize) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let Some(name) = self.path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            return Ok(());
        };
        let prefix = format!("{}.", name);

        let mut rotated: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .map(|n| n.to_string_lossy().starts_with(&prefix))
                    .unwrap_or(false)
            })
            .collect();
        // nanosecond-timestamped names sort oldest first
        rotated.sort();
        while rotated.len() > keep {
            let oldest = rotated.remove(0);
            let _ = fs::remove_file(oldest);
        }
        Ok(())
    }
}

impl Sink for FileSink {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let should_rotate = match &self.rotation {
            Some(config) => {
                self.written > 0 && self.written + bytes.len() as u64 > config.max_size_bytes
            }
            None => false,
        };
        if should_rotate {
            self.rotate()?;
        }
        self.file.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(bytes.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(feature = "compression")]
fn compress_rotated(path: &Path) -> Result<()> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let mut input = File::open(path)?;
    let gz_path = path.with_file_name(format!(
        "{}.gz",
        path.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "log".to_string())
    ));
    let encoder_out = File::create(&gz_path)?;
    let mut encoder = GzEncoder::new(encoder_out, Compression::default());
    std::io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;
    fs::remove_file(path)?;
    Ok(())
}
