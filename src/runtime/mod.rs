//! Task Runtime Module
//!
//! Periodic task loops, their shared cancellation signal, and the runner
//! that starts and stops them together.
//!
//! # Components
//!
//! - [`CancelToken`]: one-way shutdown signal checked between ticks
//! - [`Task`]: named action repeated at a fixed interval
//! - [`TaskRunner`]: one thread per task, joined on stop
//! - [`control`]: command channel fed by stdin and interrupt signals

pub mod cancel;
pub mod control;
pub mod runner;
pub mod task;

pub use cancel::CancelToken;
pub use control::Command;
pub use runner::{RunnerError, RunnerState, TaskRunner};
pub use task::{optimization_task, run_every, Task};
