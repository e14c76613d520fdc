//! Append-only run log
//!
//! One CSV row per source per run, under `metadata/run_log.csv`.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::schema::TIMESTAMP_FORMAT;

pub const RUN_LOG_FILE: &str = "metadata/run_log.csv";

/// Outcome of one source in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
    Skipped,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
            RunStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// One row of the run log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    pub source: String,
    pub records_written: usize,
    pub status: RunStatus,
    pub error_detail: String,
}

impl RunLogEntry {
    pub fn new(
        timestamp: NaiveDateTime,
        source: impl Into<String>,
        records_written: usize,
        status: RunStatus,
        error_detail: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            source: source.into(),
            records_written,
            status,
            error_detail: error_detail.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(base_path: &Path) -> Self {
        Self {
            path: base_path.join(RUN_LOG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, writing the header first if the file is new
    pub fn append(&self, entry: &RunLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                SyncError::persistence(RUN_LOG_FILE, format!("failed to open run log: {e}"))
            })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(entry)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<RunLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        reader
            .deserialize()
            .map(|row| row.map_err(SyncError::from))
            .collect()
    }

    /// The last `n` entries, oldest first
    pub fn tail(&self, n: usize) -> Result<Vec<RunLogEntry>> {
        let mut entries = self.read_all()?;
        let skip = entries.len().saturating_sub(n);
        Ok(entries.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_append_writes_header_once() {
        let temp = TempDir::new().unwrap();
        let log = RunLog::new(temp.path());
        log.append(&RunLogEntry::new(at(6), "garmin", 12, RunStatus::Success, ""))
            .unwrap();
        log.append(&RunLogEntry::new(
            at(7),
            "github",
            0,
            RunStatus::Failed,
            "source github unavailable: timeout",
        ))
        .unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "timestamp,source,records_written,status,error_detail");
        assert_eq!(lines[1], "2024-01-10T06:00:00,garmin,12,success,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_read_back_entries() {
        let temp = TempDir::new().unwrap();
        let log = RunLog::new(temp.path());
        let entry = RunLogEntry::new(
            at(6),
            "body_composition",
            0,
            RunStatus::Skipped,
            "not configured",
        );
        log.append(&entry).unwrap();
        assert_eq!(log.read_all().unwrap(), vec![entry]);
    }

    #[test]
    fn test_tail() {
        let temp = TempDir::new().unwrap();
        let log = RunLog::new(temp.path());
        for hour in 0..5 {
            log.append(&RunLogEntry::new(at(hour), "garmin", hour as usize, RunStatus::Success, ""))
                .unwrap();
        }
        let tail = log.tail(2).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].records_written, 3);
        assert_eq!(tail[1].records_written, 4);
        assert!(RunLog::new(&temp.path().join("nowhere")).tail(3).unwrap().is_empty());
    }
}
