//! Record Sinks
//!
//! Append-only destinations for [`Record`]s. Sinks are shared between task
//! threads behind an `Arc`, so every implementation must accept concurrent
//! writers.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use super::record::{LineFormat, Record};

/// Errors raised by a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The destination could not be opened
    #[error("failed to open log file '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The destination rejected a write
    #[error("log destination rejected write: {0}")]
    WriteFailure(#[from] io::Error),
}

/// An append-only destination for structured records.
pub trait Sink: Send + Sync {
    /// Appends one record.
    fn write(&self, record: &Record) -> Result<(), SinkError>;
}

/// Appends one line per record to a file.
///
/// Writers are serialized by an internal lock so lines from different
/// tasks never interleave.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    format: LineFormat,
    file: Mutex<File>,
}

impl FileSink {
    /// Opens `path` for appending, creating the file if needed.
    ///
    /// The parent directory must already exist.
    pub fn open(path: impl AsRef<Path>, format: LineFormat) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SinkError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            format,
            file: Mutex::new(file),
        })
    }

    /// Returns the path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn write(&self, record: &Record) -> Result<(), SinkError> {
        let line = record.to_line(self.format);
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}

/// Keeps records in memory, in write order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every record written so far.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of records whose message starts with `prefix`.
    pub fn count_prefixed(&self, prefix: &str) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.message.starts_with(prefix))
            .count()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Sink for MemorySink {
    fn write(&self, record: &Record) -> Result<(), SinkError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn test_file_sink_appends_lines() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("health.log");

        fs::write(&path, "existing line\n").unwrap();

        let sink = FileSink::open(&path, LineFormat::Text).unwrap();
        sink.write(&Record::info("first")).unwrap();
        sink.write(&Record::error("second")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "existing line");
        assert!(lines[1].ends_with(" - INFO - first"));
        assert!(lines[2].ends_with(" - ERROR - second"));
        assert_eq!(sink.path(), path.as_path());
    }

    #[test]
    fn test_file_sink_missing_directory() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("missing").join("health.log");

        let err = FileSink::open(&path, LineFormat::Text).unwrap_err();
        assert!(matches!(err, SinkError::Open { .. }));
        assert!(err.to_string().contains("health.log"));
    }

    #[test]
    fn test_file_sink_concurrent_writers() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("health.log");
        let sink = Arc::new(FileSink::open(&path, LineFormat::Json).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for i in 0..25 {
                        sink.write(&Record::info(format!("writer {} line {}", n, i)))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 100);
        for line in content.lines() {
            assert!(serde_json::from_str::<serde_json::Value>(line).is_ok());
        }
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.write(&Record::info("a: 1")).unwrap();
        sink.write(&Record::info("b: 2")).unwrap();
        sink.write(&Record::info("a: 3")).unwrap();

        let messages: Vec<String> = sink.records().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["a: 1", "b: 2", "a: 3"]);
        assert_eq!(sink.count_prefixed("a:"), 2);
        assert_eq!(sink.len(), 3);
    }
}
