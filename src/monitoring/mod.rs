//! Health Monitoring Module
//!
//! Reads host resource utilization and records it periodically.
//!
//! # Components
//!
//! - [`HealthSnapshot`]: CPU, memory and disk usage at one instant
//! - [`MetricsSource`]: the capability of producing snapshots
//! - [`SystemMetrics`]: `sysinfo`-backed source for the real host
//! - [`TimeoutSource`]: bounds each read of another source
//! - [`Sampler`]: writes one snapshot per tick to a sink

pub mod resource;
pub mod sampler;
pub mod snapshot;
pub mod source;

pub use resource::SystemMetrics;
pub use sampler::Sampler;
pub use snapshot::HealthSnapshot;
pub use source::{MetricsError, MetricsSource, TimeoutSource};
