//! Production log sink: bounded history mirrored to `tracing`

use super::traits::LogSink;
use crate::types::{LogEntry, LogLevel};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Process-wide sink that mirrors every entry to `tracing`
///
/// The retained history is capped at `max_entries`; once full, the oldest
/// entries are evicted whole. `success` entries are emitted at INFO with an
/// `outcome = "success"` field.
#[derive(Debug)]
pub struct TracingLogSink {
    entries: Mutex<VecDeque<LogEntry>>,
    max_entries: usize,
}

impl TracingLogSink {
    /// Create a sink that retains at most `max_entries` entries
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_entries,
        }
    }
}

impl LogSink for TracingLogSink {
    fn add_log(&self, message: &str, level: LogLevel, task_id: &str) {
        match level {
            LogLevel::Error => tracing::error!(task_id = %task_id, "{}", message),
            LogLevel::Warning => tracing::warn!(task_id = %task_id, "{}", message),
            LogLevel::Success => {
                tracing::info!(task_id = %task_id, outcome = "success", "{}", message)
            }
            LogLevel::Info => tracing::info!(task_id = %task_id, "{}", message),
        }

        if self.max_entries == 0 {
            return;
        }

        let entry = LogEntry {
            message: message.to_string(),
            level,
            task_id: task_id.to_string(),
            timestamp: chrono::Utc::now(),
        };

        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    fn logs(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    fn clear_logs(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}
