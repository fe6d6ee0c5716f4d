use std::sync::Mutex;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::application::Notifier;

const MAX_LOG_ENTRIES: usize = 100;
const SOURCE: &str = "BatchUpload";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

/// Bounded list of messages shown to the uploader, newest last
#[derive(Default)]
pub struct MessageLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&self, level: &str, source: &str, message: &str) -> LogEntry {
        let entry = LogEntry {
            time: Local::now().format("%H:%M:%S").to_string(),
            level: level.to_string(),
            source: source.to_string(),
            message: message.to_string(),
        };
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.push(entry.clone());
        if entries.len() > MAX_LOG_ENTRIES {
            entries.remove(0);
        }
        entry
    }

    pub fn add(&self, level: &str, message: &str) {
        self.add_entry(level, SOURCE, message);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Notifier for MessageLog {
    fn status(&self, message: &str) {
        self.add("INFO", message);
    }

    fn warning(&self, message: &str) {
        self.add("WARN", message);
    }

    fn error(&self, message: &str) {
        self.add("ERROR", message);
    }
}
