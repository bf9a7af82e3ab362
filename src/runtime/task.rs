//! Periodic Tasks
//!
//! A [`Task`] pairs a name and an interval with an action run once per tick.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::warn;

use crate::logging::{Record, Sink};

use super::cancel::CancelToken;

/// Action executed on every tick.
pub type Action = Box<dyn FnMut() + Send + 'static>;

/// A named action repeated at a fixed interval.
pub struct Task {
    name: String,
    interval: Duration,
    action: Action,
}

impl Task {
    /// Creates a task. The interval must be non-zero to be registered.
    pub fn new(
        name: impl Into<String>,
        interval: Duration,
        action: impl FnMut() + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            interval,
            action: Box::new(action),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs the action until `token` is cancelled and returns the tick count.
    pub fn run(&mut self, token: &CancelToken) -> u64 {
        run_every(token, self.interval, &mut self.action)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Runs `action` once per `interval` until `token` is cancelled.
///
/// Cancellation is checked between ticks only. An action that is running
/// when the token is cancelled completes, then the loop exits, so shutdown
/// latency is at most one interval plus the duration of one action.
///
/// Returns the number of completed ticks.
pub fn run_every(token: &CancelToken, interval: Duration, mut action: impl FnMut()) -> u64 {
    let mut ticks = 0;

    while !token.is_cancelled() {
        action();
        ticks += 1;

        if token.wait_timeout(interval) {
            break;
        }
    }

    ticks
}

/// Placeholder maintenance task: records `Optimizing system...` each tick.
pub fn optimization_task(sink: Arc<dyn Sink>, interval: Duration) -> Task {
    Task::new("optimization", interval, move || {
        if let Err(e) = sink.write(&Record::info("Optimizing system...")) {
            warn!("Failed to record optimization tick: {}", e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_task_accessors() {
        let task = Task::new("noop", Duration::from_secs(3), || {});
        assert_eq!(task.name(), "noop");
        assert_eq!(task.interval(), Duration::from_secs(3));
        assert!(format!("{:?}", task).contains("noop"));
    }

    #[test]
    fn test_run_every_precancelled_never_ticks() {
        let token = CancelToken::new();
        token.cancel();

        let mut calls = 0;
        let ticks = run_every(&token, Duration::from_millis(10), || calls += 1);

        assert_eq!(ticks, 0);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_run_every_stops_after_cancel_from_action() {
        let token = CancelToken::new();
        let inner = token.clone();
        let mut calls = 0;

        let ticks = run_every(&token, Duration::from_millis(5), || {
            calls += 1;
            if calls == 4 {
                inner.cancel();
            }
        });

        assert_eq!(ticks, 4);
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_run_every_tick_count_tracks_duration() {
        let token = CancelToken::new();
        let stopper = token.clone();
        let interval = Duration::from_millis(50);
        let run_for = Duration::from_millis(525);

        let handle = thread::spawn(move || run_every(&token, interval, || {}));

        let start = Instant::now();
        thread::sleep(run_for);
        stopper.cancel();
        let ticks = handle.join().unwrap();
        let elapsed = start.elapsed();

        // One tick at t=0 and one per elapsed interval, give or take jitter.
        let expected = (elapsed.as_millis() / interval.as_millis()) as u64;
        assert!(
            ticks + 1 >= expected && ticks <= expected + 1,
            "ticks={} expected={}",
            ticks,
            expected
        );
    }

    #[test]
    fn test_task_run_uses_interval() {
        let token = CancelToken::new();
        let inner = token.clone();
        let mut count = 0;
        let mut task = Task::new("counter", Duration::from_millis(1), move || {
            count += 1;
            if count == 3 {
                inner.cancel();
            }
        });

        assert_eq!(task.run(&token), 3);
    }

    #[test]
    fn test_optimization_task_records_tick() {
        let sink = Arc::new(MemorySink::new());
        let mut task = optimization_task(sink.clone(), Duration::from_millis(1));
        assert_eq!(task.name(), "optimization");

        let token = CancelToken::new();
        let stopper = token.clone();
        let handle = thread::spawn(move || {
            let ticks = task.run(&token);
            (task, ticks)
        });

        thread::sleep(Duration::from_millis(30));
        stopper.cancel();
        let (_, ticks) = handle.join().unwrap();

        assert!(ticks >= 1);
        assert_eq!(sink.count_prefixed("Optimizing system..."), ticks as usize);
    }
}
