//! Host Resource Readings
//!
//! The production [`MetricsSource`], backed by `sysinfo`.

use std::path::{Path, PathBuf};

use log::debug;
use sysinfo::{Disks, System};

use super::snapshot::HealthSnapshot;
use super::source::{MetricsError, MetricsSource};

/// Mount point whose usage is reported when none is configured.
pub const DEFAULT_MOUNT_POINT: &str = "/";

/// Reads CPU, memory and disk utilization of the host.
///
/// # Example
///
/// ```rust,no_run
/// use healthwatch::monitoring::{MetricsSource, SystemMetrics};
///
/// let mut metrics = SystemMetrics::new();
/// let snapshot = metrics.sample().unwrap();
/// println!("{}", snapshot);
/// ```
pub struct SystemMetrics {
    system: System,
    disks: Disks,
    mount_point: PathBuf,
}

impl SystemMetrics {
    /// Creates a reader reporting the disk mounted at `/`.
    pub fn new() -> Self {
        Self::with_mount_point(DEFAULT_MOUNT_POINT)
    }

    /// Creates a reader reporting the disk mounted at `mount_point`.
    ///
    /// CPU usage is computed between two refreshes, so the first refresh
    /// (the warmup) happens here.
    pub fn with_mount_point(mount_point: impl Into<PathBuf>) -> Self {
        let mut system = System::new();
        system.refresh_cpu();

        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            mount_point: mount_point.into(),
        }
    }

    /// Returns the mount point whose usage is reported.
    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    fn cpu_percent(&mut self) -> Option<f32> {
        self.system.refresh_cpu();
        if self.system.cpus().is_empty() {
            return None;
        }
        Some(self.system.global_cpu_info().cpu_usage())
    }

    fn memory_percent(&mut self) -> Option<f32> {
        self.system.refresh_memory();
        percent(self.system.used_memory(), self.system.total_memory())
    }

    fn disk_percent(&mut self) -> Option<f32> {
        self.disks.refresh();
        if self.disks.list().is_empty() {
            self.disks.refresh_list();
        }

        if let Some(disk) = self
            .disks
            .list()
            .iter()
            .find(|d| d.mount_point() == self.mount_point.as_path())
        {
            let total = disk.total_space();
            return percent(total.saturating_sub(disk.available_space()), total);
        }

        debug!(
            "Mount point {} not listed, using aggregate disk usage",
            self.mount_point.display()
        );
        let (used, total) = self.disks.list().iter().fold((0u64, 0u64), |(used, total), d| {
            (
                used + d.total_space().saturating_sub(d.available_space()),
                total + d.total_space(),
            )
        });
        percent(used, total)
    }
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for SystemMetrics {
    fn sample(&mut self) -> Result<HealthSnapshot, MetricsError> {
        let snapshot = HealthSnapshot::new(
            self.cpu_percent(),
            self.memory_percent(),
            self.disk_percent(),
        );

        if snapshot.is_empty() {
            return Err(MetricsError::unavailable(
                "cpu, memory and disk",
                "host exposes no resource metrics",
            ));
        }

        Ok(snapshot)
    }
}

/// Returns `used` as a percentage of `total`, or `None` when `total` is zero.
fn percent(used: u64, total: u64) -> Option<f32> {
    if total == 0 {
        return None;
    }
    Some((used as f64 / total as f64 * 100.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_percent() {
        assert_eq!(percent(50, 200), Some(25.0));
        assert_eq!(percent(0, 10), Some(0.0));
        assert_eq!(percent(10, 10), Some(100.0));
        assert_eq!(percent(5, 0), None);
    }

    #[test]
    fn test_default_mount_point() {
        let metrics = SystemMetrics::default();
        assert_eq!(metrics.mount_point(), Path::new("/"));
    }

    #[test]
    fn test_custom_mount_point() {
        let metrics = SystemMetrics::with_mount_point("/data");
        assert_eq!(metrics.mount_point(), Path::new("/data"));
    }

    #[test]
    fn test_sample_host() {
        let mut metrics = SystemMetrics::new();
        thread::sleep(Duration::from_millis(250));

        // The host in CI may hide individual metrics, but values that are
        // present must be valid percentages.
        if let Ok(snapshot) = metrics.sample() {
            for value in [snapshot.memory_percent(), snapshot.disk_percent()]
                .into_iter()
                .flatten()
            {
                assert!((0.0..=100.0).contains(&value));
            }
        }
    }

    #[test]
    fn test_unknown_mount_point_falls_back() {
        let mut metrics = SystemMetrics::with_mount_point("/definitely/not/mounted");
        let disk = metrics.disk_percent();
        if let Some(value) = disk {
            assert!((0.0..=100.0).contains(&value));
        }
    }
}
