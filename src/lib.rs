//! HealthWatch - Periodic Host Health Sampling
//!
//! Samples CPU, memory and disk utilization of the host at a fixed interval
//! and appends each reading to a log, alongside any other periodic tasks
//! registered with the same runner.
//!
//! # Architecture
//!
//! The library is organized into five modules:
//!
//! - [`monitoring`]: Metrics sources, snapshots and the health sampler
//! - [`runtime`]: Periodic tasks, cancellation and the task runner
//! - [`logging`]: Structured records and the sinks they are written to
//! - [`config`]: Startup settings loaded from YAML
//! - [`data`]: Named data entries guarded by restricted paths
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use healthwatch::logging::{FileSink, LineFormat, Sink};
//! use healthwatch::monitoring::{Sampler, SystemMetrics};
//! use healthwatch::runtime::TaskRunner;
//! use healthwatch::Settings;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load("configs/config.yaml")?;
//!     let sink: Arc<dyn Sink> = Arc::new(FileSink::open(&settings.log_file, LineFormat::Text)?);
//!
//!     let mut runner = TaskRunner::new("HealthWatch", Arc::clone(&sink));
//!     let sampler = Sampler::new(SystemMetrics::new(), sink);
//!     runner.register(sampler.into_task("health", settings.health_interval))?;
//!
//!     runner.start()?;
//!     // ... until asked to exit
//!     runner.stop();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod logging;
pub mod monitoring;
pub mod runtime;

// Re-export commonly used types
pub use config::Settings;
pub use monitoring::{HealthSnapshot, MetricsSource, Sampler};
pub use runtime::{Task, TaskRunner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "HealthWatch";

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "HealthWatch");
    }

    #[test]
    fn test_module_exports_task_runner() {
        let sink = Arc::new(logging::MemorySink::new());
        let mut runner = TaskRunner::new(APP_NAME, sink);
        runner
            .register(Task::new("noop", Duration::from_secs(1), || {}))
            .unwrap();
        assert_eq!(runner.task_names(), vec!["noop"]);
    }

    #[test]
    fn test_module_exports_snapshot() {
        let snapshot = HealthSnapshot::new(Some(1.0), None, None);
        assert_eq!(snapshot.cpu_percent(), Some(1.0));
    }
}
