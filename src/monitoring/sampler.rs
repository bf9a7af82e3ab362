//! Health Sampler
//!
//! Pulls a snapshot from a [`MetricsSource`] on every tick and writes it to a
//! [`Sink`]. Nothing that goes wrong during a tick stops the sampler.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};

use crate::logging::{Record, Sink};
use crate::runtime::{run_every, CancelToken, Task};

use super::source::MetricsSource;

/// Periodically records host health.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use healthwatch::logging::{FileSink, LineFormat};
/// use healthwatch::monitoring::{Sampler, SystemMetrics};
/// use healthwatch::runtime::CancelToken;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let sink = Arc::new(FileSink::open("health.log", LineFormat::Text)?);
///     let mut sampler = Sampler::new(SystemMetrics::new(), sink);
///
///     let token = CancelToken::new();
///     sampler.run(&token, Duration::from_secs(5));
///     Ok(())
/// }
/// ```
pub struct Sampler<S> {
    source: S,
    sink: Arc<dyn Sink>,
    sink_failing: bool,
}

impl<S: MetricsSource> Sampler<S> {
    pub fn new(source: S, sink: Arc<dyn Sink>) -> Self {
        Self {
            source,
            sink,
            sink_failing: false,
        }
    }

    /// Takes one sample and writes it, or the reason it failed, to the sink.
    pub fn tick(&mut self) {
        let record = match self.source.sample() {
            Ok(snapshot) => Record::health(snapshot),
            Err(e) => Record::error(format!("Metric unavailable: {}", e)),
        };
        self.emit(&record);
    }

    /// Ticks every `interval` until `token` is cancelled.
    ///
    /// The token is only observed between ticks: a sample in progress when
    /// cancellation arrives is still completed and written. Shutdown latency
    /// is therefore at most one interval plus one sample.
    ///
    /// Returns the number of ticks performed.
    pub fn run(&mut self, token: &CancelToken, interval: Duration) -> u64 {
        run_every(token, interval, || self.tick())
    }

    /// Writes a record. The first failure of a streak is surfaced through the
    /// diagnostics logger; the sampler keeps going either way.
    fn emit(&mut self, record: &Record) {
        match self.sink.write(record) {
            Ok(()) => {
                if self.sink_failing {
                    info!("Health log destination accepted writes again");
                    self.sink_failing = false;
                }
            }
            Err(e) if !self.sink_failing => {
                error!("Failed to write health record: {}", e);
                self.sink_failing = true;
            }
            Err(e) => debug!("Health record dropped: {}", e),
        }
    }
}

impl<S: MetricsSource + 'static> Sampler<S> {
    /// Wraps the sampler as a runner task ticking every `interval`.
    pub fn into_task(mut self, name: impl Into<String>, interval: Duration) -> Task {
        Task::new(name, interval, move || self.tick())
    }
}
