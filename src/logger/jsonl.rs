//! JSONL activity logger: append-only line-delimited JSON.
//!
//! Each line is a self-contained JSON object. Lines are assembled in memory
//! and written atomically via `write_all` to prevent interleaved partial
//! lines when the file is tailed by another process.
//!
//! Degradation chain:
//! 1. Primary file path
//! 2. stderr with `[MSR-JSONL]` prefix
//! 3. Silent discard (the daemon must never fail because logging failed)

#![allow(missing_docs)]

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Log event types matching the router's activity model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DaemonStart,
    DaemonStop,
    BootRouted,
    VolumeScanRequested,
    FileScanRequested,
    PromptShown,
    PromptCancelScheduled,
    EventSuppressed,
    EventDropped,
    Error,
}

/// A single JSONL log entry — all fields optional except `ts`, `event`,
/// `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    /// Event type identifier.
    pub event: EventType,
    /// Severity level.
    pub severity: Severity,
    /// Inbound event kind that produced this entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    /// Affected filesystem path (when applicable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Volume targeted by a scan request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    /// Boot-scan preference in effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preference: Option<String>,
    /// MSR error code if this entry records a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            trigger: None,
            path: None,
            volume: None,
            preference: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.display().to_string());
        self
    }

    pub fn with_volume(mut self, volume: impl ToString) -> Self {
        self.volume = Some(volume.to_string());
        self
    }

    pub fn with_preference(mut self, preference: impl ToString) -> Self {
        self.preference = Some(preference.to_string());
        self
    }

    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self.error_message = Some(message.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Degradation state of the JSONL writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Append-only JSONL log writer with graceful degradation.
pub struct JsonlWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    state: WriterState,
}

impl JsonlWriter {
    /// Open the JSONL log file, creating parent directories as needed.
    /// Falls through the degradation chain on failure.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut w = Self {
            path,
            writer: None,
            state: WriterState::Discard,
        };
        w.try_open_primary();
        w
    }

    /// Write a single log entry as one atomic JSONL line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[MSR-JSONL] serialize error: {e}");
                return;
            }
        };
        self.write_line(&line);
    }

    /// Flush buffers.
    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    /// Current degradation state, for status reporting.
    pub fn state(&self) -> &'static str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    fn write_line(&mut self, line: &str) {
        match self.state {
            WriterState::Normal => {
                if let Some(w) = self.writer.as_mut() {
                    if w.write_all(line.as_bytes()).is_err() {
                        self.degrade();
                        self.write_line(line);
                        return;
                    }
                    let _ = w.flush();
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                let _ = write!(io::stderr(), "[MSR-JSONL] {line}");
            }
            WriterState::Discard => {}
        }
    }

    fn try_open_primary(&mut self) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(file) => {
                self.writer = Some(BufWriter::with_capacity(8 * 1024, file));
                self.state = WriterState::Normal;
            }
            Err(e) => {
                self.state = WriterState::Stderr;
                let _ = writeln!(
                    io::stderr(),
                    "[MSR-JSONL] could not open {}: {e}; using stderr",
                    self.path.display()
                );
            }
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        self.state = match self.state {
            WriterState::Normal => WriterState::Stderr,
            WriterState::Stderr | WriterState::Discard => WriterState::Discard,
        };
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn writes_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let mut writer = JsonlWriter::open(&path);

        writer.write_entry(&LogEntry::new(EventType::DaemonStart, Severity::Info));
        writer.write_entry(
            &LogEntry::new(EventType::FileScanRequested, Severity::Info)
                .with_trigger("file_changed")
                .with_path(Path::new("/media/a.mp3")),
        );
        writer.flush();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        for line in &lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(parsed.get("ts").is_some());
            assert!(parsed.get("event").is_some());
            assert!(parsed.get("severity").is_some());
        }
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "file_scan_requested");
        assert_eq!(second["path"], "/media/a.mp3");
    }

    #[test]
    fn optional_fields_are_omitted() {
        let entry = LogEntry::new(EventType::DaemonStop, Severity::Info);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("path"));
        assert!(!json.contains("error_code"));
    }

    #[test]
    fn error_entry_carries_code_and_message() {
        let entry = LogEntry::new(EventType::EventDropped, Severity::Warning)
            .with_trigger("file_changed")
            .with_error("MSR-2001", "could not canonicalize /x");
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["event"], "event_dropped");
        assert_eq!(parsed["error_code"], "MSR-2001");
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("log.jsonl");
        let mut writer = JsonlWriter::open(&path);
        writer.write_entry(&LogEntry::new(EventType::DaemonStart, Severity::Info));
        writer.flush();
        assert!(path.exists());
        assert_eq!(writer.state(), "normal");
    }

    #[test]
    fn unwritable_path_degrades_to_stderr() {
        // A directory path cannot be opened for append.
        let dir = tempfile::tempdir().unwrap();
        let writer = JsonlWriter::open(dir.path());
        assert_eq!(writer.state(), "stderr");
    }

    #[test]
    fn appends_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        {
            let mut w = JsonlWriter::open(&path);
            w.write_entry(&LogEntry::new(EventType::DaemonStart, Severity::Info));
        }
        {
            let mut w = JsonlWriter::open(&path);
            w.write_entry(&LogEntry::new(EventType::DaemonStop, Severity::Info));
        }
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
