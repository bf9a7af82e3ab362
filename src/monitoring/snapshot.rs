//! Health Snapshots
//!
//! Point-in-time resource utilization of the host.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// An immutable point-in-time reading of host resource usage.
///
/// Each percentage is `None` when the host does not expose that metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    cpu_percent: Option<f32>,
    memory_percent: Option<f32>,
    disk_percent: Option<f32>,
    timestamp: DateTime<Utc>,
}

impl HealthSnapshot {
    /// Creates a snapshot stamped with the current time.
    pub fn new(cpu: Option<f32>, memory: Option<f32>, disk: Option<f32>) -> Self {
        Self::at(cpu, memory, disk, Utc::now())
    }

    /// Creates a snapshot with an explicit timestamp.
    pub fn at(
        cpu: Option<f32>,
        memory: Option<f32>,
        disk: Option<f32>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            cpu_percent: cpu,
            memory_percent: memory,
            disk_percent: disk,
            timestamp,
        }
    }

    pub fn cpu_percent(&self) -> Option<f32> {
        self.cpu_percent
    }

    pub fn memory_percent(&self) -> Option<f32> {
        self.memory_percent
    }

    pub fn disk_percent(&self) -> Option<f32> {
        self.disk_percent
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns true if every metric was read.
    pub fn is_complete(&self) -> bool {
        self.cpu_percent.is_some() && self.memory_percent.is_some() && self.disk_percent.is_some()
    }

    /// Returns true if no metric was read.
    pub fn is_empty(&self) -> bool {
        self.cpu_percent.is_none() && self.memory_percent.is_none() && self.disk_percent.is_none()
    }
}

/// Formats an optional percentage, `n/a` when missing.
struct Percent(Option<f32>);

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{:.1}%", value),
            None => write!(f, "n/a"),
        }
    }
}

impl fmt::Display for HealthSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CPU Usage: {}, Memory Usage: {}, Disk Usage: {}",
            Percent(self.cpu_percent),
            Percent(self.memory_percent),
            Percent(self.disk_percent)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_display() {
        let snapshot = HealthSnapshot::new(Some(12.34), Some(50.0), Some(99.96));
        assert_eq!(
            snapshot.to_string(),
            "CPU Usage: 12.3%, Memory Usage: 50.0%, Disk Usage: 100.0%"
        );
    }

    #[test]
    fn test_snapshot_display_missing_metric() {
        let snapshot = HealthSnapshot::new(Some(5.0), None, Some(1.0));
        assert_eq!(
            snapshot.to_string(),
            "CPU Usage: 5.0%, Memory Usage: n/a, Disk Usage: 1.0%"
        );
        assert!(!snapshot.is_complete());
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_snapshot_completeness() {
        assert!(HealthSnapshot::new(Some(1.0), Some(2.0), Some(3.0)).is_complete());
        assert!(HealthSnapshot::new(None, None, None).is_empty());
    }

    #[test]
    fn test_snapshot_accessors() {
        let now = Utc::now();
        let snapshot = HealthSnapshot::at(Some(10.0), Some(20.0), None, now);

        assert_eq!(snapshot.cpu_percent(), Some(10.0));
        assert_eq!(snapshot.memory_percent(), Some(20.0));
        assert_eq!(snapshot.disk_percent(), None);
        assert_eq!(snapshot.timestamp(), now);
    }
}
