//! In-memory log sink for tests

use super::traits::LogSink;
use crate::types::{LogEntry, LogLevel};
use std::sync::Mutex;

/// Unbounded in-memory sink with no console output
///
/// # Examples
///
/// ```
/// use illust_proxy::log_manager::{LogSink, MemoryLogSink};
/// use illust_proxy::types::LogLevel;
///
/// let sink = MemoryLogSink::new();
/// sink.add_log("fetching page info", LogLevel::Info, "task-1");
/// assert_eq!(sink.logs_for_task("task-1").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of one task at one level, oldest first
    pub fn messages(&self, task_id: &str, level: LogLevel) -> Vec<String> {
        self.logs_for_task(task_id)
            .into_iter()
            .filter(|entry| entry.level == level)
            .map(|entry| entry.message)
            .collect()
    }
}

impl LogSink for MemoryLogSink {
    fn add_log(&self, message: &str, level: LogLevel, task_id: &str) {
        let entry = LogEntry {
            message: message.to_string(),
            level,
            task_id: task_id.to_string(),
            timestamp: chrono::Utc::now(),
        };
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }

    fn logs(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn clear_logs(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}
