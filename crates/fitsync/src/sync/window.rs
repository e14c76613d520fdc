//! Sync window controller
//!
//! The window is derived from persisted data on every run: if the daily
//! health partition holds nothing from the last week, the run is treated as
//! a first run and reaches further back.

use std::fmt;

use chrono::{Duration, NaiveDate};
use tracing::{info, warn};

use crate::schema::RecordType;
use crate::storage::PartitionStore;

/// Days without daily health data before a run counts as a first run
pub const RECENT_DATA_DAYS: i64 = 7;
pub const FIRST_RUN_DAYS: i64 = 30;
pub const INCREMENTAL_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    FirstRun,
    Incremental,
}

impl RunMode {
    pub fn lookback_days(&self) -> i64 {
        match self {
            RunMode::FirstRun => FIRST_RUN_DAYS,
            RunMode::Incremental => INCREMENTAL_DAYS,
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::FirstRun => f.write_str("first run"),
            RunMode::Incremental => f.write_str("incremental"),
        }
    }
}

/// Inclusive date range requested from every source in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub mode: RunMode,
}

impl SyncWindow {
    pub fn new(today: NaiveDate, mode: RunMode) -> Self {
        Self {
            start: today - Duration::days(mode.lookback_days()),
            end: today,
            mode,
        }
    }

    /// Classify from the dates present in the daily health partition
    pub fn classify<I>(today: NaiveDate, health_dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let cutoff = today - Duration::days(RECENT_DATA_DAYS);
        let recent = health_dates.into_iter().any(|d| d >= cutoff && d <= today);
        let mode = if recent {
            RunMode::Incremental
        } else {
            RunMode::FirstRun
        };
        Self::new(today, mode)
    }

    /// Compute this run's window from the partition store
    pub fn from_store(store: &PartitionStore, today: NaiveDate) -> Self {
        let dates = match store.read(RecordType::DailyHealth) {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| row.record.value("date").as_date())
                .collect::<Vec<_>>(),
            Err(e) => {
                warn!(error = %e, "daily health partition unreadable, treating as first run");
                Vec::new()
            }
        };
        let window = Self::classify(today, dates);
        info!(
            mode = %window.mode,
            start = %window.start,
            end = %window.end,
            "computed sync window"
        );
        window
    }

    /// Every date in the window, oldest first
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for SyncWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {} ({})", self.start, self.end, self.mode)
    }
}
