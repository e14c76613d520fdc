//! Storage layer
//!
//! One CSV partition per record type plus an append-only run log.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//! ├── activities/
//! │   ├── running_activities.csv
//! │   ├── surfing_activities.csv
//! │   └── ...
//! ├── health/daily_metrics.csv
//! ├── physiological/vo2_training_status.csv
//! ├── body_composition/daily_body_metrics.csv
//! ├── lifestyle/daily_coding_metrics.csv
//! ├── training_zones/weekly_training_zones.csv
//! ├── recovery_trends/recovery_trends.csv
//! └── metadata/run_log.csv
//! ```
//!
//! Partitions are rewritten atomically (temp file + rename), so readers
//! always see either the previous or the new version of a file.

mod merge;
mod partition;
mod run_log;

pub use merge::{merge_rows, MergeOutcome};
pub use partition::{PartitionStore, StoredRow};
pub use run_log::{RunLog, RunLogEntry, RunStatus, RUN_LOG_FILE};

use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};

/// Platform data directory, used when no data dir is configured
pub fn default_storage_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fitsync")
}

/// Partition store and run log under one data directory
#[derive(Debug, Clone)]
pub struct Storage {
    pub partitions: PartitionStore,
    pub run_log: RunLog,
}

impl Storage {
    /// Open storage at a data directory, creating it if needed
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path).map_err(|e| {
            SyncError::persistence(
                base_path.display().to_string(),
                format!("failed to create storage directory: {e}"),
            )
        })?;

        Ok(Self {
            run_log: RunLog::new(&base_path),
            partitions: PartitionStore::new(base_path),
        })
    }

    pub fn base_path(&self) -> &Path {
        self.partitions.base_path()
    }
}
