//! Append-only fault log.
//!
//! One record per fault: `[timestamp] [component] Error: message`, followed by
//! optional detail lines and a blank line. Write failures are reported through
//! `tracing` and otherwise ignored.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{error, warn};

#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: Option<PathBuf>,
}

impl ErrorLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// A log that only forwards to `tracing`.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record a fault from `component`.
    pub fn record(&self, component: &str, message: &str, detail: Option<&str>) {
        error!(component, "{}", message);

        let Some(path) = &self.path else {
            return;
        };
        let line = format_record(
            &chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            component,
            message,
            detail,
        );
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| f.write_all(line.as_bytes()));
        if let Err(e) = result {
            warn!("Failed to write error log {}: {}", path.display(), e);
        }
    }
}

fn format_record(timestamp: &str, component: &str, message: &str, detail: Option<&str>) -> String {
    let mut out = format!("[{}] [{}] Error: {}\n", timestamp, component, message);
    if let Some(detail) = detail {
        out.push_str("Details:\n");
        out.push_str(detail);
        out.push_str("\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_record() {
        let rec = format_record("2024-01-01T00:00:00.000Z", "sendMessage", "boom", None);
        assert_eq!(rec, "[2024-01-01T00:00:00.000Z] [sendMessage] Error: boom\n");

        let rec = format_record("t", "harvest", "bad", Some("Timeout(..)"));
        assert!(rec.ends_with("Details:\nTimeout(..)\n\n"));
    }

    #[test]
    fn test_records_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("error_log.txt");
        let log = ErrorLog::new(&path);
        log.record("selectThread", "first", None);
        log.record("selectModel", "second", Some("stale"));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].ends_with("[selectThread] Error: first"));
        assert!(lines[1].ends_with("[selectModel] Error: second"));
        assert_eq!(lines[2], "Details:");
    }

    #[test]
    fn test_disabled_log_writes_nothing() {
        let log = ErrorLog::disabled();
        assert!(log.path().is_none());
        log.record("close", "ignored", None);
    }
}
