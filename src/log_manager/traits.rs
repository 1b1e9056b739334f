//! The log sink interface and the task-bound logger handle

use crate::types::{LogEntry, LogLevel};
use std::sync::Arc;

/// Append-only, thread-safe destination for diagnostic log entries
///
/// Implementations must accept concurrent appends from many requests and must
/// never modify an entry after it has been appended.
pub trait LogSink: Send + Sync {
    /// Append one entry
    fn add_log(&self, message: &str, level: LogLevel, task_id: &str);

    /// Snapshot of the retained entries, oldest first
    fn logs(&self) -> Vec<LogEntry>;

    /// Drop every retained entry
    fn clear_logs(&self);

    /// Retained entries for one task, oldest first
    fn logs_for_task(&self, task_id: &str) -> Vec<LogEntry> {
        self.logs()
            .into_iter()
            .filter(|entry| entry.task_id == task_id)
            .collect()
    }
}

/// A [`LogSink`] bound to one task correlation id
#[derive(Clone)]
pub struct TaskLogger {
    sink: Arc<dyn LogSink>,
    task_id: String,
}

impl TaskLogger {
    /// Bind `sink` to `task_id`
    pub fn new(sink: Arc<dyn LogSink>, task_id: impl Into<String>) -> Self {
        Self {
            sink,
            task_id: task_id.into(),
        }
    }

    /// The task correlation id
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Append an entry at `level`
    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        self.sink.add_log(message.as_ref(), level, &self.task_id);
    }

    /// Append an info entry
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    /// Append a warning entry
    pub fn warning(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warning, message);
    }

    /// Append an error entry
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }

    /// Append a success entry
    pub fn success(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Success, message);
    }
}

impl std::fmt::Debug for TaskLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskLogger")
            .field("task_id", &self.task_id)
            .finish_non_exhaustive()
    }
}
