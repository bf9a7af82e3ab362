//! Task Runner
//!
//! Owns a set of periodic tasks and starts or stops them as a unit.
//!
//! ```text
//! Idle --start()--> Running --stop()--> Stopping --all joined--> Idle
//! ```
//!
//! `start()` on a running runner and `stop()` on an idle one are no-ops.

use std::io;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::logging::{Record, Sink};

use super::cancel::CancelToken;
use super::task::Task;

/// Lifecycle state of a [`TaskRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// No task loop is running
    Idle,
    /// One loop per registered task is running
    Running,
    /// Cancellation was signalled but some loops have not exited yet
    Stopping,
}

/// Errors raised by runner lifecycle operations.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Tasks can only be registered while idle
    #[error("cannot register task '{0}' while the runner is not idle")]
    NotIdle(String),

    /// A task was registered with a zero interval
    #[error("task '{0}' has a zero interval")]
    InvalidInterval(String),

    /// A previous stop timed out and its loops are still winding down
    #[error("runner is still stopping")]
    StillStopping,

    /// Some loops did not exit within the caller's limit
    #[error("timed out waiting for tasks to stop: {}", .pending.join(", "))]
    StopTimeout { pending: Vec<String> },

    /// A task thread could not be spawned
    #[error("failed to spawn task '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// A running task loop.
struct Worker {
    name: String,
    handle: JoinHandle<Task>,
}

/// Reports a loop's exit on drop, so panicking loops are reported too.
struct ExitNotice {
    name: String,
    exited: Sender<String>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.exited.send(std::mem::take(&mut self.name));
    }
}

/// Runs each registered [`Task`] on its own thread.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use healthwatch::logging::MemorySink;
/// use healthwatch::runtime::{Task, TaskRunner};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let sink = Arc::new(MemorySink::new());
///     let mut runner = TaskRunner::new("demo", sink);
///     runner.register(Task::new("noop", Duration::from_secs(1), || {}))?;
///
///     runner.start()?;
///     runner.stop();
///     Ok(())
/// }
/// ```
pub struct TaskRunner {
    label: String,
    sink: Arc<dyn Sink>,
    tasks: Vec<Task>,
    workers: Vec<Worker>,
    token: CancelToken,
    exits: Option<Receiver<String>>,
    pending: Vec<String>,
    state: RunnerState,
}

impl TaskRunner {
    /// Creates an idle runner. `label` names the runner in lifecycle records.
    pub fn new(label: impl Into<String>, sink: Arc<dyn Sink>) -> Self {
        Self {
            label: label.into(),
            sink,
            tasks: Vec::new(),
            workers: Vec::new(),
            token: CancelToken::new(),
            exits: None,
            pending: Vec::new(),
            state: RunnerState::Idle,
        }
    }

    /// Adds a task. Only allowed while idle.
    pub fn register(&mut self, task: Task) -> Result<(), RunnerError> {
        if self.state != RunnerState::Idle {
            return Err(RunnerError::NotIdle(task.name().to_string()));
        }
        if task.interval().is_zero() {
            return Err(RunnerError::InvalidInterval(task.name().to_string()));
        }

        debug!(
            "Registered task '{}' (every {:?})",
            task.name(),
            task.interval()
        );
        self.tasks.push(task);
        Ok(())
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Returns the names of all registered tasks, running or not.
    pub fn task_names(&self) -> Vec<String> {
        self.tasks
            .iter()
            .map(|t| t.name().to_string())
            .chain(self.workers.iter().map(|w| w.name.clone()))
            .collect()
    }

    /// Starts one loop per registered task.
    ///
    /// Does nothing if the runner is already running.
    pub fn start(&mut self) -> Result<(), RunnerError> {
        match self.state {
            RunnerState::Running => {
                debug!("{} is already running", self.label);
                return Ok(());
            }
            RunnerState::Stopping => return Err(RunnerError::StillStopping),
            RunnerState::Idle => {}
        }

        self.record(Record::info(format!("Starting the {}...", self.label)));

        self.token = CancelToken::new();
        let (exit_tx, exit_rx) = channel();

        let mut queued = std::mem::take(&mut self.tasks).into_iter();
        while let Some(mut task) = queued.next() {
            let name = task.name().to_string();
            let token = self.token.clone();
            let notice = ExitNotice {
                name: name.clone(),
                exited: exit_tx.clone(),
            };

            let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
                let _notice = notice;
                let ticks = task.run(&token);
                debug!("Task '{}' exited after {} ticks", task.name(), ticks);
                task
            });

            match spawned {
                Ok(handle) => {
                    self.pending.push(name.clone());
                    self.workers.push(Worker { name, handle });
                }
                Err(source) => {
                    // The failed task went down with its closure; the rest
                    // stay registered.
                    error!("Failed to spawn task '{}': {}", name, source);
                    self.tasks.extend(queued);
                    self.exits = Some(exit_rx);
                    self.state = RunnerState::Running;
                    self.stop();
                    return Err(RunnerError::Spawn { name, source });
                }
            }
        }

        self.exits = Some(exit_rx);
        self.state = RunnerState::Running;
        info!("{} started {} task(s)", self.label, self.workers.len());
        Ok(())
    }

    /// Signals every loop to exit and blocks until all of them have.
    ///
    /// Does nothing if the runner is idle.
    pub fn stop(&mut self) {
        if !self.begin_stop() {
            return;
        }
        self.join_workers();
    }

    /// Like [`stop`](Self::stop), but gives up after `limit`.
    ///
    /// On timeout the runner stays in [`RunnerState::Stopping`] and the error
    /// names the loops that have not exited. Calling `stop` or `stop_timeout`
    /// again resumes waiting.
    pub fn stop_timeout(&mut self, limit: Duration) -> Result<(), RunnerError> {
        if !self.begin_stop() {
            return Ok(());
        }

        // A limit too large to add to the clock is no limit at all.
        let Some(deadline) = Instant::now().checked_add(limit) else {
            self.join_workers();
            return Ok(());
        };
        if let Some(exits) = self.exits.as_ref() {
            while !self.pending.is_empty() {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match exits.recv_timeout(remaining) {
                    Ok(name) => self.pending.retain(|p| *p != name),
                    Err(RecvTimeoutError::Timeout) => {
                        warn!(
                            "{} tasks still running after {:?}: {:?}",
                            self.label, limit, self.pending
                        );
                        return Err(RunnerError::StopTimeout {
                            pending: self.pending.clone(),
                        });
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        }

        self.join_workers();
        Ok(())
    }

    /// Cancels the loops. Returns false if there is nothing to stop.
    fn begin_stop(&mut self) -> bool {
        match self.state {
            RunnerState::Idle => {
                debug!("{} is not running", self.label);
                false
            }
            RunnerState::Stopping => true,
            RunnerState::Running => {
                self.record(Record::info(format!("Stopping the {}...", self.label)));
                self.state = RunnerState::Stopping;
                self.token.cancel();
                true
            }
        }
    }

    /// Joins every loop and returns the runner to idle.
    fn join_workers(&mut self) {
        for worker in self.workers.drain(..) {
            match worker.handle.join() {
                Ok(task) => self.tasks.push(task),
                Err(_) => {
                    error!("Task '{}' panicked and was removed", worker.name);
                    if let Err(e) = self
                        .sink
                        .write(&Record::error(format!("Task '{}' panicked", worker.name)))
                    {
                        warn!("Failed to record task panic: {}", e);
                    }
                }
            }
        }

        self.pending.clear();
        self.exits = None;
        self.state = RunnerState::Idle;
        self.record(Record::info(format!("{} stopped.", self.label)));
    }

    fn record(&self, record: Record) {
        info!("{}", record.message);
        if let Err(e) = self.sink.write(&record) {
            warn!("Failed to record lifecycle event: {}", e);
        }
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        self.stop();
    }
}
