//! Sync orchestration
//!
//! Provides:
//! - Sync window derived from persisted daily health data
//! - Rate-limited provider access
//! - Per-source fetch → normalize → merge, isolated from other sources
//! - Derived weekly and recovery aggregates
//! - One run log entry per source per run

pub mod derive;
pub mod rate_limiter;
pub mod window;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Local, NaiveDate, NaiveDateTime};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::normalize::normalize;
use crate::schema::{Record, RecordType};
use crate::sources::{FetchOutput, Source, SourceSlot};
use crate::storage::{MergeOutcome, RunLogEntry, RunStatus, Storage};

pub use rate_limiter::RateLimiter;
pub use window::{RunMode, SyncWindow};

/// Name logged for the derived aggregates
pub const DERIVED_SOURCE: &str = "derived";

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub today: NaiveDate,
    /// Fetch and count without writing partitions or the run log
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            dry_run: false,
        }
    }
}

/// Outcome of one source in one run
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub source: String,
    pub status: RunStatus,
    pub outcomes: Vec<MergeOutcome>,
    /// Fetch, merge and source-level failures
    pub failures: Vec<String>,
    /// Items rejected by the normalizer
    pub rejected: Vec<String>,
}

impl SourceReport {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            status: RunStatus::Success,
            outcomes: Vec::new(),
            failures: Vec::new(),
            rejected: Vec::new(),
        }
    }

    fn skipped(source: &str, reason: &str) -> Self {
        let mut report = Self::new(source);
        report.status = RunStatus::Skipped;
        report.failures.push(reason.to_string());
        report
    }

    fn failed(source: &str, detail: String) -> Self {
        let mut report = Self::new(source);
        report.status = RunStatus::Failed;
        report.failures.push(detail);
        report
    }

    pub fn records_written(&self) -> usize {
        self.outcomes.iter().map(MergeOutcome::written).sum()
    }

    pub fn records_skipped(&self) -> usize {
        self.rejected.len() + self.outcomes.iter().map(|o| o.skipped).sum::<usize>()
    }

    /// Success when nothing failed, partial when some record types merged
    fn settle(&mut self) {
        self.status = if self.failures.is_empty() {
            RunStatus::Success
        } else if self.outcomes.is_empty() {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        };
    }

    /// Text for the run log's `error_detail` column
    pub fn error_detail(&self) -> String {
        match self.status {
            RunStatus::Success => {
                let skipped = self.records_skipped();
                if skipped == 0 {
                    String::new()
                } else {
                    format!("{skipped} records skipped")
                }
            }
            RunStatus::Partial => {
                let counts = self
                    .outcomes
                    .iter()
                    .map(|o| format!("{}={}", o.record_type, o.written()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("written: {}; failed: {}", counts, self.failures.join("; "))
            }
            RunStatus::Failed | RunStatus::Skipped => self.failures.join("; "),
        }
    }

    fn log_entry(&self, timestamp: NaiveDateTime) -> RunLogEntry {
        RunLogEntry::new(
            timestamp,
            self.source.clone(),
            self.records_written(),
            self.status,
            self.error_detail(),
        )
    }
}

impl fmt::Display for SourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<18} {:<8} {:>6} written",
            self.source,
            self.status.as_str(),
            self.records_written()
        )?;
        let detail = self.error_detail();
        if !detail.is_empty() {
            write!(f, "  ({})", detail)?;
        }
        Ok(())
    }
}

/// Result of one sync run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub window: SyncWindow,
    pub dry_run: bool,
    pub reports: Vec<SourceReport>,
}

impl RunSummary {
    pub fn total_written(&self) -> usize {
        self.reports.iter().map(SourceReport::records_written).sum()
    }

    pub fn report(&self, source: &str) -> Option<&SourceReport> {
        self.reports.iter().find(|r| r.source == source)
    }

    pub fn has_failures(&self) -> bool {
        self.reports
            .iter()
            .any(|r| matches!(r.status, RunStatus::Failed | RunStatus::Partial))
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Window: {}", self.window)?;
        for report in &self.reports {
            writeln!(f, "  {}", report)?;
        }
        write!(f, "Total: {} records written", self.total_written())?;
        if self.dry_run {
            write!(f, " (dry run, nothing persisted)")?;
        }
        Ok(())
    }
}

/// Sync engine running every source in a fixed order
pub struct SyncEngine {
    storage: Storage,
    sources: Vec<SourceSlot>,
}

impl SyncEngine {
    pub fn new(storage: Storage, sources: Vec<SourceSlot>) -> Self {
        Self { storage, sources }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Run every source, then the derived aggregates.
    ///
    /// Source failures end up in the summary and the run log; only a failure
    /// to append to the run log aborts the run.
    pub async fn run(&self, opts: SyncOptions) -> Result<RunSummary> {
        let window = SyncWindow::from_store(&self.storage.partitions, opts.today);
        info!(window = %window, dry_run = opts.dry_run, "starting sync");

        let mut reports = Vec::with_capacity(self.sources.len() + 1);
        for slot in &self.sources {
            let report = match slot {
                SourceSlot::Enabled(source) => {
                    self.sync_source(source.as_ref(), &window, opts).await
                }
                SourceSlot::Disabled { name, reason } => {
                    info!(source = %name, reason = %reason, "source not configured, skipping");
                    SourceReport::skipped(name, reason)
                }
            };
            self.record(&report, opts)?;
            reports.push(report);
        }

        let report = self.sync_derived(&window, opts);
        self.record(&report, opts)?;
        reports.push(report);

        let summary = RunSummary {
            window,
            dry_run: opts.dry_run,
            reports,
        };
        info!(written = summary.total_written(), "sync finished");
        Ok(summary)
    }

    async fn sync_source(
        &self,
        source: &dyn Source,
        window: &SyncWindow,
        opts: SyncOptions,
    ) -> SourceReport {
        let name = source.name();
        info!(source = %name, "fetching");
        match source.fetch(window).await {
            Ok(output) => self.merge_fetched(name, output, opts),
            Err(e) => {
                error!(source = %name, error = %e, "source failed");
                SourceReport::failed(name, e.to_string())
            }
        }
    }

    fn merge_fetched(&self, name: &str, output: FetchOutput, opts: SyncOptions) -> SourceReport {
        let mut report = SourceReport::new(name);
        report
            .failures
            .extend(output.failures.iter().map(ToString::to_string));

        let mut batches: BTreeMap<RecordType, Vec<Record>> = BTreeMap::new();
        for item in &output.items {
            match normalize(item) {
                Ok(normalized) => batches
                    .entry(normalized.record_type)
                    .or_default()
                    .push(normalized.record),
                Err(e) => {
                    warn!(source = %name, kind = %item.kind, error = %e, "rejecting item");
                    report.rejected.push(format!("{}: {}", item.kind, e));
                }
            }
        }

        self.merge_batches(&mut report, batches, opts);
        report
    }

    fn sync_derived(&self, window: &SyncWindow, opts: SyncOptions) -> SourceReport {
        match derive::derive_records(&self.storage.partitions, window) {
            Ok(derived) => {
                let mut report = SourceReport::new(DERIVED_SOURCE);
                let mut batches: BTreeMap<RecordType, Vec<Record>> = BTreeMap::new();
                for (record_type, record) in derived {
                    batches.entry(record_type).or_default().push(record);
                }
                self.merge_batches(&mut report, batches, opts);
                report
            }
            Err(e) => {
                error!(error = %e, "derived aggregates failed");
                SourceReport::failed(DERIVED_SOURCE, e.to_string())
            }
        }
    }

    /// Merge each record type independently; a failed partition does not stop the others
    fn merge_batches(
        &self,
        report: &mut SourceReport,
        batches: BTreeMap<RecordType, Vec<Record>>,
        opts: SyncOptions,
    ) {
        let store = &self.storage.partitions;
        for (record_type, records) in batches {
            let result = if opts.dry_run {
                store.preview(record_type, &records)
            } else {
                store.upsert(record_type, &records)
            };
            match result {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => {
                    error!(
                        source = %report.source,
                        record_type = %record_type,
                        error = %e,
                        "merge failed"
                    );
                    report.failures.push(format!("{record_type}: {e}"));
                }
            }
        }
        report.settle();
    }

    fn record(&self, report: &SourceReport, opts: SyncOptions) -> Result<()> {
        if opts.dry_run {
            return Ok(());
        }
        self.storage
            .run_log
            .append(&report.log_entry(Local::now().naive_local()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;

    fn outcome(record_type: RecordType, inserted: usize) -> MergeOutcome {
        let mut outcome = MergeOutcome::new(record_type);
        outcome.inserted = inserted;
        outcome
    }

    #[test]
    fn test_settle_statuses() {
        let mut report = SourceReport::new("garmin");
        report.outcomes.push(outcome(RecordType::DailyHealth, 3));
        report.settle();
        assert_eq!(report.status, RunStatus::Success);

        report.failures.push("physiological: boom".to_string());
        report.settle();
        assert_eq!(report.status, RunStatus::Partial);
        assert_eq!(
            report.error_detail(),
            "written: daily_health=3; failed: physiological: boom"
        );

        let mut report = SourceReport::new("garmin");
        report.failures.push(SyncError::NotAuthenticated.to_string());
        report.settle();
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.records_written(), 0);
    }

    #[test]
    fn test_success_detail_mentions_skips() {
        let mut report = SourceReport::new("github");
        report.rejected.push("coding_day: bad".to_string());
        report.settle();
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.error_detail(), "1 records skipped");
    }
}
