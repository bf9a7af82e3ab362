//! Record Logging Module
//!
//! Structured records and the sinks they are written to. Components receive
//! a sink explicitly; nothing here installs a process-wide logger.
//!
//! # Components
//!
//! - [`Record`]: severity, timestamp, message and optional snapshot
//! - [`Sink`]: append-only destination trait
//! - [`FileSink`] / [`MemorySink`]: file and in-memory destinations

pub mod record;
pub mod sink;

pub use record::{LineFormat, Record};
pub use sink::{FileSink, MemorySink, Sink, SinkError};
