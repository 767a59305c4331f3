//! Job log entries

use shipyard_api::{LogEntry, LogLevel};

use crate::streams::cursor::Cursor;

/// A log entry as stored in a job stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub id: Cursor,
    pub timestamp: String,
    pub level: LogLevel,
    pub line: String,
}

impl LogRecord {
    /// Wire representation
    pub fn to_entry(&self) -> LogEntry {
        LogEntry {
            id: self.id.to_string(),
            timestamp: self.timestamp.clone(),
            level: self.level,
            line: self.line.clone(),
        }
    }
}

/// A log entry about to be appended; the store assigns the cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogRecord {
    pub timestamp: String,
    pub level: LogLevel,
    pub line: String,
}

impl NewLogRecord {
    pub fn new(level: LogLevel, line: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now()
                .naive_utc()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
            level,
            line: line.into(),
        }
    }
}

/// Stored form of a level: its first letter, as written by the workers
pub fn level_tag(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "i",
        LogLevel::Error => "e",
    }
}

/// Anything starting with `e` is an error, everything else reads as info
pub fn parse_level_tag(tag: &str) -> LogLevel {
    if tag.trim_start().to_ascii_lowercase().starts_with('e') {
        LogLevel::Error
    } else {
        LogLevel::Info
    }
}
