use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::errors::AppError;

pub const NO_HISTORY: &str = "No history found.";
pub const DEFAULT_RECENT: usize = 20;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub message: String,
}

impl HistoryEntry {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            message: message.into(),
        }
    }

    /// Parses a `[YYYY-MM-DD HH:MM:SS] message` line.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('[')?;
        let (timestamp, message) = rest.split_once("] ")?;
        chrono::NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()?;
        Some(Self {
            timestamp: timestamp.to_string(),
            message: message.to_string(),
        })
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp, self.message)
    }
}

/// Append-only event log, one line per event.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, message: &str) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", HistoryEntry::now(message))?;
        Ok(())
    }

    /// Up to `n` most recent lines, newest first. A missing log yields the
    /// single [`NO_HISTORY`] line instead of nothing.
    pub fn read_recent(&self, n: usize) -> Result<Vec<String>, AppError> {
        if !self.path.exists() {
            return Ok(vec![NO_HISTORY.to_string()]);
        }
        let content = fs::read_to_string(&self.path)?;
        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..]
            .iter()
            .rev()
            .map(|line| line.trim().to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn append_then_read_one() {
        let dir = TempDir::new().unwrap();
        let log = HistoryLog::new(dir.path().join("nested").join("history.log"));
        log.append("Update run: Success").unwrap();

        let recent = log.read_recent(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert!(recent[0].contains("Update run: Success"));
        let entry = HistoryEntry::parse(&recent[0]).unwrap();
        assert_eq!(entry.message, "Update run: Success");
        assert_eq!(entry.timestamp.len(), 19);
    }

    #[test]
    fn newest_first_and_capped() {
        let dir = TempDir::new().unwrap();
        let log = HistoryLog::new(dir.path().join("history.log"));
        for i in 0..25 {
            log.append(&format!("event {i}")).unwrap();
        }

        let recent = log.read_recent(DEFAULT_RECENT).unwrap();
        assert_eq!(recent.len(), 20);
        assert!(recent[0].ends_with("event 24"));
        assert!(recent[19].ends_with("event 5"));
    }

    #[test]
    fn missing_file_gives_marker() {
        let dir = TempDir::new().unwrap();
        let log = HistoryLog::new(dir.path().join("history.log"));
        assert_eq!(log.read_recent(20).unwrap(), [NO_HISTORY]);
    }

    #[test]
    fn empty_file_gives_nothing() {
        let dir = TempDir::new().unwrap();
        let log = HistoryLog::new(dir.path().join("history.log"));
        fs::write(log.path(), "").unwrap();
        assert!(log.read_recent(20).unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        assert!(HistoryEntry::parse("no brackets").is_none());
        assert!(HistoryEntry::parse("[yesterday] ran").is_none());
        let entry = HistoryEntry::parse("[2024-05-01 08:30:00] Update run: Failed").unwrap();
        assert_eq!(entry.to_string(), "[2024-05-01 08:30:00] Update run: Failed");
    }
}
