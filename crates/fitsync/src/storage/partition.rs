//! CSV partition files, one per record type

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::schema::{Record, RecordType, SchemaDescriptor, Value};

/// A row read back from a partition.
///
/// `key` is `None` when the stored key could not be parsed; such rows are
/// kept on rewrite but never matched against incoming records.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub record: Record,
    pub key: Option<Vec<String>>,
}

/// Reads and atomically rewrites partition files under a data directory
#[derive(Debug, Clone)]
pub struct PartitionStore {
    base_path: PathBuf,
}

impl PartitionStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Absolute path of a record type's partition file
    pub fn partition_path(&self, record_type: RecordType) -> PathBuf {
        self.base_path.join(record_type.schema().relative_path())
    }

    pub fn exists(&self, record_type: RecordType) -> bool {
        self.partition_path(record_type).exists()
    }

    /// Read a partition, projecting each row onto the current schema.
    ///
    /// Columns are matched by header name, so files written by an older
    /// schema load with their missing columns filled by policy.
    pub fn read(&self, record_type: RecordType) -> Result<Vec<StoredRow>> {
        let schema = record_type.schema();
        let path = self.partition_path(record_type);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)?;
        let header: HashMap<String, usize> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();

        let missing: Vec<&str> = schema
            .columns
            .iter()
            .map(|c| c.name)
            .filter(|name| !header.contains_key(*name))
            .collect();
        let extra = header.len().saturating_sub(schema.columns.len() - missing.len());
        if !missing.is_empty() || extra > 0 {
            warn!(
                partition = %schema.relative_path().display(),
                missing = ?missing,
                extra,
                "partition header differs from schema, rows will be migrated"
            );
        }

        let mut rows = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let raw = result?;
            rows.push(parse_row(schema, &header, &raw, line + 2));
        }
        debug!(
            partition = %schema.relative_path().display(),
            rows = rows.len(),
            "read partition"
        );
        Ok(rows)
    }

    /// Replace a partition's content atomically.
    ///
    /// Rows go to a temp file in the same directory, which is flushed and
    /// synced before being renamed over the previous version.
    pub fn write(&self, record_type: RecordType, rows: &[Record]) -> Result<()> {
        let schema = record_type.schema();
        let path = self.partition_path(record_type);
        let label = schema.relative_path().display().to_string();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SyncError::persistence(&label, format!("failed to create directory: {e}"))
            })?;
        }

        let temp_path = path.with_extension("csv.tmp");
        if let Err(e) = write_rows(schema, &temp_path, rows) {
            let _ = fs::remove_file(&temp_path);
            return Err(SyncError::persistence(&label, e.to_string()));
        }

        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            SyncError::persistence(&label, format!("failed to replace partition: {e}"))
        })?;

        debug!(partition = %label, rows = rows.len(), "wrote partition");
        Ok(())
    }
}

fn parse_row(
    schema: &SchemaDescriptor,
    header: &HashMap<String, usize>,
    raw: &csv::StringRecord,
    line: usize,
) -> StoredRow {
    let mut record = Record::new();
    let mut key_ok = true;

    for column in &schema.columns {
        let cell = header
            .get(column.name)
            .and_then(|i| raw.get(*i))
            .unwrap_or_default();
        let value = match column.parse_cell(cell) {
            Ok(value) => value,
            Err(reason) => {
                if schema.key.contains(&column.name) {
                    key_ok = false;
                }
                debug!(line, reason = %reason, "keeping unparseable cell verbatim");
                Value::Text(cell.to_string())
            }
        };
        record.set(column.name, value);
    }

    let key = if key_ok {
        schema.key_of(&record).ok()
    } else {
        None
    };
    if key.is_none() {
        warn!(
            partition = %schema.relative_path().display(),
            line,
            "stored row has no usable key, preserving it unmatched"
        );
    }
    StoredRow { record, key }
}

fn write_rows(schema: &SchemaDescriptor, path: &Path, rows: &[Record]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(schema.header())?;
    for row in rows {
        writer.write_record(schema.columns.iter().map(|c| row.value(c.name).render()))?;
    }
    let file = writer
        .into_inner()
        .map_err(|e| SyncError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}
