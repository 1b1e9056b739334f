//! Per-task diagnostic logging
//!
//! Every step of the proxy pipeline (metadata lookups, each download attempt,
//! the terminal outcome) is recorded as an append-only [`LogEntry`] tagged with
//! the task correlation id of the request that produced it.
//!
//! ## Architecture
//!
//! The core abstraction is the [`LogSink`] trait. Two implementations are provided:
//!
//! - [`TracingLogSink`]: Production sink, keeps a bounded history and mirrors every
//!   entry to `tracing` at the matching level
//! - [`MemoryLogSink`]: In-memory sink for tests, so attempt sequences can be
//!   asserted without parsing console output
//!
//! Components log through a [`TaskLogger`], which binds a sink to one task id.
//!
//! [`LogEntry`]: crate::types::LogEntry

mod memory;
mod traits;
mod tracing_sink;

pub use memory::MemoryLogSink;
pub use traits::{LogSink, TaskLogger};
pub use tracing_sink::TracingLogSink;
