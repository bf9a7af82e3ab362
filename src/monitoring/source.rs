//! Metrics Sources
//!
//! The [`MetricsSource`] capability and a wrapper that bounds how long a
//! single read may take.

use std::io;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use thiserror::Error;

use super::snapshot::HealthSnapshot;

/// Errors raised while reading host metrics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    /// A metric (or the whole reading) could not be obtained
    #[error("{metric} unavailable: {reason}")]
    UnavailableMetric { metric: String, reason: String },
}

impl MetricsError {
    pub fn unavailable(metric: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnavailableMetric {
            metric: metric.into(),
            reason: reason.into(),
        }
    }
}

/// Something that can read the host's current resource usage.
///
/// Implementations should report a single missing metric as a `None` field
/// of the snapshot and reserve errors for readings that produced nothing.
pub trait MetricsSource: Send {
    fn sample(&mut self) -> Result<HealthSnapshot, MetricsError>;
}

impl MetricsSource for Box<dyn MetricsSource> {
    fn sample(&mut self) -> Result<HealthSnapshot, MetricsError> {
        (**self).sample()
    }
}

type Reply = (u64, Result<HealthSnapshot, MetricsError>);

/// Runs a source on its own worker thread and bounds each read.
///
/// A read that does not answer within the timeout is reported as
/// [`MetricsError::UnavailableMetric`]. At most one read is in flight: until
/// a timed-out read answers, further calls fail fast without queueing another
/// read, and its late answer is discarded. The worker exits once this wrapper
/// is dropped and the in-flight read returns.
pub struct TimeoutSource {
    requests: Sender<u64>,
    replies: Receiver<Reply>,
    next_id: u64,
    outstanding: Option<u64>,
    timeout: Duration,
}

impl TimeoutSource {
    /// Moves `source` onto a worker thread.
    pub fn spawn<S>(mut source: S, timeout: Duration) -> io::Result<Self>
    where
        S: MetricsSource + 'static,
    {
        let (request_tx, request_rx) = channel::<u64>();
        let (reply_tx, reply_rx) = channel::<Reply>();

        thread::Builder::new()
            .name("metrics-source".to_string())
            .spawn(move || {
                for id in request_rx {
                    let result = source.sample();
                    if reply_tx.send((id, result)).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            requests: request_tx,
            replies: reply_rx,
            next_id: 0,
            outstanding: None,
            timeout,
        })
    }

    /// Returns the per-read timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Collects answers that arrived since the last call without blocking.
    ///
    /// Returns false once the worker is gone.
    fn drain_late_replies(&mut self) -> bool {
        loop {
            match self.replies.try_recv() {
                Ok((id, _)) => {
                    debug!("Discarding late metrics reply #{}", id);
                    if self.outstanding == Some(id) {
                        self.outstanding = None;
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => {
                    self.outstanding = None;
                    return false;
                }
            }
        }
    }

    fn wait_for(&mut self, id: u64) -> Result<HealthSnapshot, MetricsError> {
        // A timeout too large to add to the clock waits without a deadline.
        let deadline = Instant::now().checked_add(self.timeout);
        loop {
            let reply = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    self.replies.recv_timeout(remaining)
                }
                None => self
                    .replies
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match reply {
                Ok((reply_id, result)) if reply_id == id => {
                    self.outstanding = None;
                    return result;
                }
                Ok((stale_id, _)) => {
                    debug!("Discarding late metrics reply #{}", stale_id);
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(MetricsError::unavailable(
                        "metrics",
                        format!("read timed out after {:?}", self.timeout),
                    ));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.outstanding = None;
                    return Err(worker_stopped());
                }
            }
        }
    }
}

impl MetricsSource for TimeoutSource {
    fn sample(&mut self) -> Result<HealthSnapshot, MetricsError> {
        if self.outstanding.is_some() && !self.drain_late_replies() {
            return Err(worker_stopped());
        }
        if self.outstanding.is_some() {
            return Err(MetricsError::unavailable("metrics", "read still in progress"));
        }

        let id = self.next_id;
        self.next_id += 1;

        if self.requests.send(id).is_err() {
            return Err(worker_stopped());
        }
        self.outstanding = Some(id);

        self.wait_for(id)
    }
}

fn worker_stopped() -> MetricsError {
    MetricsError::unavailable("metrics", "source worker has stopped")
}
