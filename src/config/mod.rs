//! Startup Configuration
//!
//! Settings are read once from a YAML file before any task starts and are
//! never modified afterwards.
//!
//! ```yaml
//! restricted_paths:
//!   - /path/to/restricted_directory
//! data_directory: /path/to/data_directory
//! log_file: logs/ai_log.txt
//! health_interval_secs: 5
//! optimization_interval_secs: 10
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use crate::logging::LineFormat;
use crate::monitoring::resource::DEFAULT_MOUNT_POINT;

/// Configuration file used when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "HEALTHWATCH_CONFIG";

const DEFAULT_LOG_FILE: &str = "logs/ai_log.txt";
const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 5;
const DEFAULT_OPTIMIZATION_INTERVAL_SECS: u64 = 10;
const DEFAULT_SAMPLE_TIMEOUT_MS: u64 = 2000;

/// Errors that prevent startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("required setting '{0}' is missing")]
    Missing(&'static str),

    #[error("invalid setting '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// File layout. Every field but `data_directory` has a default.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    #[serde(default)]
    restricted_paths: Vec<PathBuf>,
    data_directory: Option<PathBuf>,
    log_file: Option<PathBuf>,
    #[serde(default)]
    log_format: LineFormat,
    health_interval_secs: Option<u64>,
    optimization_interval_secs: Option<u64>,
    sample_timeout_ms: Option<u64>,
    disk_mount_point: Option<PathBuf>,
}

/// Validated, immutable process settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Paths no data operation may touch
    pub restricted_paths: Vec<PathBuf>,
    /// Where data entries are written
    pub data_directory: PathBuf,
    /// Health log destination
    pub log_file: PathBuf,
    /// Line format of the health log
    pub log_format: LineFormat,
    /// Time between health samples
    pub health_interval: Duration,
    /// Time between optimization ticks
    pub optimization_interval: Duration,
    /// Longest a single metrics read may take
    pub sample_timeout: Duration,
    /// Mount point whose disk usage is reported
    pub disk_mount_point: PathBuf,
}

impl Settings {
    /// Loads and validates settings from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Configuration loaded ({} bytes)", content.len());
        Self::from_yaml(&content)
    }

    /// Parses and validates settings from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings = serde_yaml::from_str(content)?;

        let data_directory = raw
            .data_directory
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::Missing("data_directory"))?;

        Ok(Self {
            restricted_paths: raw.restricted_paths,
            data_directory,
            log_file: raw.log_file.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            log_format: raw.log_format,
            health_interval: seconds(
                "health_interval_secs",
                raw.health_interval_secs.unwrap_or(DEFAULT_HEALTH_INTERVAL_SECS),
            )?,
            optimization_interval: seconds(
                "optimization_interval_secs",
                raw.optimization_interval_secs.unwrap_or(DEFAULT_OPTIMIZATION_INTERVAL_SECS),
            )?,
            sample_timeout: millis(
                "sample_timeout_ms",
                raw.sample_timeout_ms.unwrap_or(DEFAULT_SAMPLE_TIMEOUT_MS),
            )?,
            disk_mount_point: raw
                .disk_mount_point
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MOUNT_POINT)),
        })
    }
}

fn seconds(field: &'static str, value: u64) -> Result<Duration, ConfigError> {
    non_zero(field, value).map(Duration::from_secs)
}

fn millis(field: &'static str, value: u64) -> Result<Duration, ConfigError> {
    non_zero(field, value).map(Duration::from_millis)
}

fn non_zero(field: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Resolves the configuration path: explicit argument, then
/// `HEALTHWATCH_CONFIG`, then the default.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
