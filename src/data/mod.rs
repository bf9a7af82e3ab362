//! Data Entries
//!
//! Appends named text entries under the configured data directory. Any
//! target inside a restricted path is refused.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use log::warn;
use thiserror::Error;

use crate::config::Settings;
use crate::logging::{Record, Sink};

/// Errors raised by data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("'{}' is inside a restricted path", .0.display())]
    Restricted(PathBuf),

    #[error("invalid data name '{0}'")]
    InvalidName(String),

    #[error("failed to write '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes data entries and records each operation in a sink.
pub struct DataManager {
    data_directory: PathBuf,
    restricted_paths: Vec<PathBuf>,
    working_dir: Option<PathBuf>,
    sink: Arc<dyn Sink>,
}

impl DataManager {
    pub fn new(
        data_directory: impl Into<PathBuf>,
        restricted_paths: Vec<PathBuf>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        let working_dir = std::env::current_dir().ok();
        let restricted_paths = restricted_paths
            .iter()
            .map(|p| absolute(working_dir.as_deref(), p))
            .collect();

        Self {
            data_directory: data_directory.into(),
            restricted_paths,
            working_dir,
            sink,
        }
    }

    pub fn from_settings(settings: &Settings, sink: Arc<dyn Sink>) -> Self {
        Self::new(
            settings.data_directory.clone(),
            settings.restricted_paths.clone(),
            sink,
        )
    }

    /// Returns true if `path` is a restricted path or lies under one.
    ///
    /// Relative paths on either side are taken against the working directory
    /// at construction. Paths are then compared lexically; nothing is
    /// resolved on disk.
    pub fn is_restricted(&self, path: &Path) -> bool {
        let path = absolute(self.working_dir.as_deref(), path);
        self.restricted_paths.iter().any(|r| path.starts_with(r))
    }

    /// Returns the file backing the data entry `name`.
    pub fn entry_path(&self, name: &str) -> Result<PathBuf, DataError> {
        validate_name(name)?;
        Ok(self.data_directory.join(format!("{}.txt", name)))
    }

    /// Records that `name` is stored in `file_name`.
    pub fn register_data(&self, name: &str, file_name: impl AsRef<Path>) -> Result<(), DataError> {
        validate_name(name)?;
        let file_name = file_name.as_ref();
        if self.is_restricted(file_name) {
            return Err(DataError::Restricted(file_name.to_path_buf()));
        }

        self.record(format!(
            "Registered data: {} in file: {}",
            name,
            file_name.display()
        ));
        Ok(())
    }

    /// Appends `content` as one line to the entry `name`.
    ///
    /// The data directory must already exist. Returns the file written.
    pub fn log_data(&self, name: &str, content: &str) -> Result<PathBuf, DataError> {
        let path = self.entry_path(name)?;
        if self.is_restricted(&path) {
            return Err(DataError::Restricted(path));
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| writeln!(file, "{}", content))
            .map_err(|source| DataError::Io {
                path: path.clone(),
                source,
            })?;

        self.record(format!("Logged data for {}: {}", name, content));
        Ok(path)
    }

    fn record(&self, message: String) {
        if let Err(e) = self.sink.write(&Record::info(message)) {
            warn!("Failed to record data operation: {}", e);
        }
    }
}

/// Rejects names that would escape the data directory.
fn validate_name(name: &str) -> Result<(), DataError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains('/')
        || trimmed.contains('\\')
    {
        return Err(DataError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Joins a relative `path` onto `base`, then normalizes it.
fn absolute(base: Option<&Path>, path: &Path) -> PathBuf {
    match base {
        Some(base) if path.is_relative() => normalize(&base.join(path)),
        _ => normalize(path),
    }
}

/// Drops `.` components and resolves `..` lexically.
///
/// `..` at the root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
