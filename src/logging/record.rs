//! Structured Log Records
//!
//! A [`Record`] is the unit written to a [`Sink`](super::Sink): a severity,
//! a local timestamp, a message and, for health ticks, the snapshot that
//! produced the message.

use chrono::{DateTime, Local};
use log::Level;
use serde::Deserialize;
use serde_json::json;

use crate::monitoring::HealthSnapshot;

/// Timestamp layout used by text lines, e.g. `2024-03-01 12:00:05,123`.
const TEXT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// How a record is rendered to a single output line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineFormat {
    /// `timestamp - LEVEL - message`
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// A single structured log record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Severity of the record
    pub level: Level,
    /// When the record was created
    pub timestamp: DateTime<Local>,
    /// Human-readable message
    pub message: String,
    /// Snapshot carried by health records
    pub snapshot: Option<HealthSnapshot>,
}

impl Record {
    /// Creates a record stamped with the current local time.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Local::now(),
            message: message.into(),
            snapshot: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Level::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    /// Creates the INFO record written for a successful health tick.
    pub fn health(snapshot: HealthSnapshot) -> Self {
        let mut record = Self::info(format!("Health Metrics: {}", snapshot));
        record.snapshot = Some(snapshot);
        record
    }

    /// Renders the record as one line without a trailing newline.
    pub fn to_line(&self, format: LineFormat) -> String {
        match format {
            LineFormat::Text => format!(
                "{} - {} - {}",
                self.timestamp.format(TEXT_TIMESTAMP_FORMAT),
                self.level,
                self.message
            ),
            LineFormat::Json => json!({
                "timestamp": self.timestamp.to_rfc3339(),
                "level": self.level.as_str(),
                "message": self.message,
                "snapshot": self.snapshot,
            })
            .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_record() -> Record {
        let mut record = Record::warn("disk almost full");
        record.timestamp = Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 5).unwrap();
        record
    }

    #[test]
    fn test_text_line_format() {
        let line = fixed_record().to_line(LineFormat::Text);
        assert_eq!(line, "2024-03-01 12:00:05,000 - WARN - disk almost full");
    }

    #[test]
    fn test_json_line_is_single_object() {
        let line = fixed_record().to_line(LineFormat::Json);
        assert!(!line.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["level"], "WARN");
        assert_eq!(value["message"], "disk almost full");
        assert!(value["snapshot"].is_null());
    }

    #[test]
    fn test_health_record_carries_snapshot() {
        let snapshot = HealthSnapshot::new(Some(10.0), Some(20.0), Some(30.0));
        let record = Record::health(snapshot.clone());

        assert_eq!(record.level, Level::Info);
        assert!(record.message.starts_with("Health Metrics:"));
        assert_eq!(record.snapshot, Some(snapshot));

        let value: serde_json::Value =
            serde_json::from_str(&record.to_line(LineFormat::Json)).unwrap();
        assert_eq!(value["snapshot"]["cpu_percent"], 10.0);
        assert_eq!(value["snapshot"]["disk_percent"], 30.0);
    }

    #[test]
    fn test_line_format_deserialize() {
        let format: LineFormat = serde_yaml::from_str("json").unwrap();
        assert_eq!(format, LineFormat::Json);
        assert_eq!(LineFormat::default(), LineFormat::Text);
    }
}
