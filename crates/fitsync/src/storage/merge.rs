//! Merge/upsert engine
//!
//! Incoming records are projected onto the partition schema and matched by
//! composite key: an equal key replaces the stored row entirely, anything
//! else is appended. The merged partition is re-sorted by its time column
//! (ties broken by key) and written back atomically.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use tracing::{debug, info, warn};

use super::partition::{PartitionStore, StoredRow};
use crate::error::{Result, SyncError};
use crate::schema::{Record, RecordType, SchemaDescriptor};

/// Counts from merging one batch into one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub record_type: RecordType,
    pub updated: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub skip_reasons: Vec<String>,
}

impl MergeOutcome {
    pub fn new(record_type: RecordType) -> Self {
        Self {
            record_type,
            updated: 0,
            inserted: 0,
            skipped: 0,
            skip_reasons: Vec::new(),
        }
    }

    /// Rows that reached the partition
    pub fn written(&self) -> usize {
        self.inserted + self.updated
    }

    fn skip(&mut self, reason: String) {
        self.skipped += 1;
        self.skip_reasons.push(reason);
    }
}

impl fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} inserted, {} updated, {} skipped",
            self.record_type, self.inserted, self.updated, self.skipped
        )
    }
}

impl PartitionStore {
    /// Upsert records into a record type's partition.
    ///
    /// Malformed records are skipped and reported in the outcome. Only a
    /// failure to read or persist the partition is returned as an error, in
    /// which case the previous file is left as it was.
    pub fn upsert(&self, record_type: RecordType, records: &[Record]) -> Result<MergeOutcome> {
        let (outcome, rows) = self.plan(record_type, records)?;
        if let Some(rows) = rows {
            self.write(record_type, &rows)?;
            info!(outcome = %outcome, rows = rows.len(), "merged partition");
        }
        Ok(outcome)
    }

    /// Counts an upsert would produce, without touching the partition
    pub fn preview(&self, record_type: RecordType, records: &[Record]) -> Result<MergeOutcome> {
        self.plan(record_type, records).map(|(outcome, _)| outcome)
    }

    /// Merged rows to write, or `None` when nothing survived projection
    fn plan(
        &self,
        record_type: RecordType,
        records: &[Record],
    ) -> Result<(MergeOutcome, Option<Vec<Record>>)> {
        if records.is_empty() {
            return Ok((MergeOutcome::new(record_type), None));
        }

        let schema = record_type.schema();
        let (incoming, mut outcome) = project_batch(schema, records);
        if incoming.is_empty() {
            info!(outcome = %outcome, "nothing to merge");
            return Ok((outcome, None));
        }

        let stored = self.read(record_type)?;
        let rows = merge_rows(schema, stored, incoming, &mut outcome);
        Ok((outcome, Some(rows)))
    }
}

/// Project a batch onto the schema, collecting skip reasons
fn project_batch(
    schema: &SchemaDescriptor,
    records: &[Record],
) -> (Vec<(Vec<String>, Record)>, MergeOutcome) {
    let mut outcome = MergeOutcome::new(schema.record_type);
    let mut dropped = BTreeSet::new();
    let mut incoming = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        dropped.extend(schema.unknown_columns(record));
        let projected = schema
            .project(record)
            .and_then(|p| schema.key_of(&p).map(|key| (key, p)));
        match projected {
            Ok(entry) => incoming.push(entry),
            Err(e) => {
                debug!(record_type = %schema.record_type, index, error = %e, "skipping record");
                outcome.skip(format!("record {index}: {e}"));
            }
        }
    }

    if !dropped.is_empty() {
        let mismatch = SyncError::schema_mismatch(
            schema.record_type.id(),
            format!("dropping unknown columns {dropped:?}"),
        );
        warn!(error = %mismatch, "projecting batch onto schema");
    }
    (incoming, outcome)
}

/// Pure merge of stored rows with projected incoming records
pub fn merge_rows(
    schema: &SchemaDescriptor,
    stored: Vec<StoredRow>,
    incoming: Vec<(Vec<String>, Record)>,
    outcome: &mut MergeOutcome,
) -> Vec<Record> {
    let mut index: HashMap<Vec<String>, usize> = HashMap::with_capacity(stored.len());
    let mut rows: Vec<Record> = Vec::with_capacity(stored.len() + incoming.len());

    for row in stored {
        if let Some(key) = row.key {
            // A duplicate already on disk collapses onto its last occurrence
            if let Some(&position) = index.get(&key) {
                rows[position] = row.record;
                continue;
            }
            index.insert(key, rows.len());
        }
        rows.push(row.record);
    }

    for (key, record) in incoming {
        match index.get(&key) {
            Some(&position) => {
                rows[position] = record;
                outcome.updated += 1;
            }
            None => {
                index.insert(key, rows.len());
                rows.push(record);
                outcome.inserted += 1;
            }
        }
    }

    rows.sort_by(|a, b| compare_rows(schema, a, b));
    rows
}

fn compare_rows(schema: &SchemaDescriptor, a: &Record, b: &Record) -> Ordering {
    std::iter::once(schema.order_by)
        .chain(schema.key.iter().copied())
        .map(|column| a.value(column).sort_cmp(b.value(column)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ActivityCategory, Value};
    use tempfile::TempDir;

    const RUNNING: RecordType = RecordType::Activity(ActivityCategory::Running);

    fn run(date: &str, id: &str, duration: f64) -> Record {
        Record::new()
            .with("date", date)
            .with("activity_id", id)
            .with("duration_seconds", duration)
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let temp = TempDir::new().unwrap();
        let store = PartitionStore::new(temp.path());
        let outcome = store.upsert(RUNNING, &[]).unwrap();
        assert_eq!(outcome, MergeOutcome::new(RUNNING));
        assert!(!store.exists(RUNNING));
    }

    #[test]
    fn test_insert_creates_partition() {
        let temp = TempDir::new().unwrap();
        let store = PartitionStore::new(temp.path());
        let outcome = store.upsert(RUNNING, &[run("2024-01-01", "a1", 30.0)]).unwrap();
        assert_eq!(outcome.inserted, 1);
        assert!(store.exists(RUNNING));
    }

    #[test]
    fn test_overwrite_replaces_whole_row() {
        let temp = TempDir::new().unwrap();
        let store = PartitionStore::new(temp.path());
        let first = run("2024-01-01", "a1", 30.0).with("avg_hr", 150.0);
        store.upsert(RUNNING, &[first]).unwrap();

        let outcome = store.upsert(RUNNING, &[run("2024-01-01", "a1", 35.0)]).unwrap();
        assert_eq!((outcome.inserted, outcome.updated), (0, 1));

        let rows = store.read(RUNNING).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.value("duration_seconds"), &Value::Float(35.0));
        // not a field-wise merge
        assert!(rows[0].record.value("avg_hr").is_missing());
    }

    #[test]
    fn test_invalid_records_are_skipped_not_fatal() {
        let temp = TempDir::new().unwrap();
        let store = PartitionStore::new(temp.path());
        let batch = vec![
            run("2024-01-01", "a1", 30.0),
            Record::new().with("activity_id", "no-date"),
            run("2024-01-02", "a2", 10.0).with("max_hr", "very high"),
        ];
        let outcome = store.upsert(RUNNING, &batch).unwrap();
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.skipped, 2);
        assert!(outcome.skip_reasons[0].contains("missing key field date"));
        assert!(outcome.skip_reasons[1].contains("max_hr"));
    }

    #[test]
    fn test_all_invalid_batch_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let store = PartitionStore::new(temp.path());
        let outcome = store
            .upsert(RUNNING, &[Record::new().with("activity_id", "x")])
            .unwrap();
        assert_eq!(outcome.skipped, 1);
        assert!(!store.exists(RUNNING));
    }

    #[test]
    fn test_duplicate_keys_within_batch_last_wins() {
        let temp = TempDir::new().unwrap();
        let store = PartitionStore::new(temp.path());
        let outcome = store
            .upsert(
                RUNNING,
                &[run("2024-01-01", "a1", 30.0), run("2024-01-01", "a1", 40.0)],
            )
            .unwrap();
        assert_eq!((outcome.inserted, outcome.updated), (1, 1));
        let rows = store.read(RUNNING).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.value("duration_seconds"), &Value::Float(40.0));
    }

    #[test]
    fn test_rows_sorted_by_date_then_key() {
        let temp = TempDir::new().unwrap();
        let store = PartitionStore::new(temp.path());
        store
            .upsert(
                RUNNING,
                &[
                    run("2024-01-03", "c", 1.0),
                    run("2024-01-01", "b", 1.0),
                    run("2024-01-01", "a", 1.0),
                ],
            )
            .unwrap();
        let ids: Vec<String> = store
            .read(RUNNING)
            .unwrap()
            .iter()
            .map(|r| r.record.value("activity_id").render())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_preview_does_not_write() {
        let temp = TempDir::new().unwrap();
        let store = PartitionStore::new(temp.path());
        store.upsert(RUNNING, &[run("2024-01-01", "a1", 30.0)]).unwrap();

        let outcome = store
            .preview(
                RUNNING,
                &[run("2024-01-01", "a1", 35.0), run("2024-01-02", "a2", 10.0)],
            )
            .unwrap();
        assert_eq!((outcome.inserted, outcome.updated), (1, 1));
        assert_eq!(store.read(RUNNING).unwrap().len(), 1);
    }

    #[test]
    fn test_order_independent_of_batch_history() {
        let together = TempDir::new().unwrap();
        let store = PartitionStore::new(together.path());
        store
            .upsert(
                RUNNING,
                &[
                    run("2024-01-01", "2", 1.0),
                    run("2024-01-01", "10", 1.0),
                    run("2024-01-01", "1x", 1.0),
                ],
            )
            .unwrap();

        let one_by_one = TempDir::new().unwrap();
        let other = PartitionStore::new(one_by_one.path());
        for id in ["1x", "2", "10"] {
            other.upsert(RUNNING, &[run("2024-01-01", id, 1.0)]).unwrap();
        }

        let ids: Vec<String> = store
            .read(RUNNING)
            .unwrap()
            .iter()
            .map(|r| r.record.value("activity_id").render())
            .collect();
        assert_eq!(ids, vec!["2", "10", "1x"]);
        assert_eq!(
            std::fs::read_to_string(store.partition_path(RUNNING)).unwrap(),
            std::fs::read_to_string(other.partition_path(RUNNING)).unwrap()
        );
    }

    #[test]
    fn test_numeric_ids_sort_numerically() {
        let schema = RUNNING.schema();
        let a = schema.project(&run("2024-01-01", "9", 1.0)).unwrap();
        let b = schema.project(&run("2024-01-01", "10", 1.0)).unwrap();
        assert_eq!(compare_rows(schema, &a, &b), Ordering::Less);
    }

    #[test]
    fn test_unmatched_stored_rows_survive_merge() {
        let schema = RecordType::DailyHealth.schema();
        let orphan = StoredRow {
            record: Record::new().with("date", "garbage"),
            key: None,
        };
        let incoming = vec![(
            vec!["2024-01-01".to_string()],
            schema.project(&Record::new().with("date", "2024-01-01")).unwrap(),
        )];
        let mut outcome = MergeOutcome::new(RecordType::DailyHealth);
        let rows = merge_rows(schema, vec![orphan], incoming, &mut outcome);
        assert_eq!(rows.len(), 2);
        assert_eq!(outcome.inserted, 1);
    }
}
