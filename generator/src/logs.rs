//! Leveled progress logs for batch runs.
//!
//! Every entry is printed to the console. When a log file has been set up
//! with [`init_log_file`], entries are also appended to it as JSON lines.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Time the entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Optional indentation level (for nested logs)
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            indent: 0,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Console form of the entry.
    pub fn console_line(&self) -> String {
        let prefix = match self.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(self.indent as usize);
        format!("{}{} {}", indent, prefix, self.message)
    }
}

/// Global log sink
pub static LOG_SINK: Lazy<LogSink> = Lazy::new(LogSink::new);

/// Writes entries to the console and, optionally, to a log file
pub struct LogSink {
    file: Mutex<Option<File>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self {
            file: Mutex::new(None),
        }
    }

    /// Append all following entries to `path` (created if missing).
    pub fn set_file(&self, path: &Path) -> io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if let Ok(mut slot) = self.file.lock() {
            *slot = Some(file);
        }
        Ok(())
    }

    pub fn log(&self, entry: LogEntry) {
        match entry.level {
            LogLevel::Warning | LogLevel::Error => eprintln!("{}", entry.console_line()),
            _ => println!("{}", entry.console_line()),
        }

        // A failing log file must not abort the run
        if let Ok(mut slot) = self.file.lock() {
            if let Some(file) = slot.as_mut() {
                if let Ok(line) = serde_json::to_string(&entry) {
                    let _ = writeln!(file, "{}", line);
                }
            }
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Also write log entries to `path`, as JSON lines.
pub fn init_log_file(path: &Path) -> io::Result<()> {
    LOG_SINK.set_file(path)
}

/// Convenient logging functions
pub fn log_info(msg: impl Into<String>) {
    LOG_SINK.log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_SINK.log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_SINK.log(LogEntry::warning(msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_SINK.log(LogEntry::error(msg));
}

pub fn log_warning_indent(msg: impl Into<String>, indent: u8) {
    LOG_SINK.log(LogEntry::warning(msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_line() {
        assert_eq!(LogEntry::info("Reading").console_line(), "    Reading");
        assert_eq!(LogEntry::success("done").console_line(), "   ✓ done");
        assert_eq!(
            LogEntry::error("bad").with_indent(1).console_line(),
            "      ❌ bad"
        );
    }

    #[test]
    fn test_entry_serialization() {
        let json = serde_json::to_value(LogEntry::warning("row 3 skipped")).unwrap();
        assert_eq!(json["level"], "warning");
        assert_eq!(json["message"], "row 3 skipped");
        assert_eq!(json["indent"], 0);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_global_error_reaches_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modsgen.log");
        init_log_file(&path).unwrap();

        log_error("Error: input.csv: unreadable");

        // Other tests share the global sink, so only look for this entry
        let content = std::fs::read_to_string(&path).unwrap();
        let found = content
            .lines()
            .filter_map(|l| serde_json::from_str::<LogEntry>(l).ok())
            .any(|e| e.level == LogLevel::Error && e.message == "Error: input.csv: unreadable");
        assert!(found);
    }

    #[test]
    fn test_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let sink = LogSink::new();
        sink.set_file(&path).unwrap();
        sink.log(LogEntry::info("first"));
        sink.log(LogEntry::error("second").with_indent(2));

        let content = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<LogEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].level, LogLevel::Error);
        assert_eq!(entries[1].indent, 2);
    }
}
