//! Status command: what is stored per partition

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::error::Result;
use crate::schema::RecordType;
use crate::storage::{default_storage_path, StoredRow, Storage};

use super::resolve_data_dir;

/// Row count and date range of one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionStats {
    pub record_type: RecordType,
    pub rows: usize,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}

impl PartitionStats {
    pub fn from_rows(record_type: RecordType, rows: &[StoredRow]) -> Self {
        let order_by = record_type.schema().order_by;
        let dates: Vec<NaiveDate> = rows
            .iter()
            .filter_map(|row| row.record.value(order_by).as_date())
            .collect();
        Self {
            record_type,
            rows: rows.len(),
            first: dates.iter().min().copied(),
            last: dates.iter().max().copied(),
        }
    }
}

/// Show stored partitions
pub async fn show(data_dir: Option<PathBuf>) -> Result<()> {
    let data_dir = resolve_data_dir(data_dir)?;

    if !data_dir.exists() {
        println!("No data found at {}", data_dir.display());
        println!("Run 'fitsync sync' to create it.");
        println!("Platform data directory: {}", default_storage_path().display());
        return Ok(());
    }

    let storage = Storage::open(&data_dir)?;
    println!("Data directory: {}", storage.base_path().display());
    println!();
    println!(
        "{:<28} {:>8} {:>12} {:>12}",
        "Partition", "Rows", "First", "Last"
    );
    println!("{}", "-".repeat(63));

    for record_type in RecordType::all() {
        if !storage.partitions.exists(record_type) {
            continue;
        }
        let line = match storage.partitions.read(record_type) {
            Ok(rows) => {
                let stats = PartitionStats::from_rows(record_type, &rows);
                let date =
                    |d: Option<NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
                format!(
                    "{:<28} {:>8} {:>12} {:>12}",
                    record_type.id(),
                    stats.rows,
                    date(stats.first),
                    date(stats.last)
                )
            }
            Err(e) => format!("{:<28} unreadable: {}", record_type.id(), e),
        };
        println!("{}", line);
    }

    if let Some(last) = storage.run_log.tail(1)?.pop() {
        println!("\nLast run: {} ({} {})", last.timestamp, last.source, last.status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Record;

    fn row(date: &str) -> StoredRow {
        StoredRow {
            record: Record::new().with("date", date.parse::<NaiveDate>().unwrap()),
            key: Some(vec![date.to_string()]),
        }
    }

    #[test]
    fn test_partition_stats_date_range() {
        let rows = vec![row("2024-03-05"), row("2024-03-01"), row("2024-03-09")];
        let stats = PartitionStats::from_rows(RecordType::DailyHealth, &rows);
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.first, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(stats.last, NaiveDate::from_ymd_opt(2024, 3, 9));
    }

    #[test]
    fn test_partition_stats_empty() {
        let stats = PartitionStats::from_rows(RecordType::DailyHealth, &[]);
        assert_eq!(stats.rows, 0);
        assert!(stats.first.is_none());
    }
}
