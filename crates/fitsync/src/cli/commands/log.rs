//! Run log command

use std::path::PathBuf;

use crate::error::Result;
use crate::storage::Storage;

use super::{resolve_data_dir, truncate};

/// Print the most recent run log entries
pub async fn show(data_dir: Option<PathBuf>, limit: usize) -> Result<()> {
    let storage = Storage::open(resolve_data_dir(data_dir)?)?;
    let entries = storage.run_log.tail(limit)?;

    if entries.is_empty() {
        println!("No sync runs recorded yet.");
        return Ok(());
    }

    println!(
        "{:<20} {:<18} {:>8} {:<8} {}",
        "Timestamp", "Source", "Written", "Status", "Detail"
    );
    println!("{}", "-".repeat(90));

    for entry in &entries {
        println!(
            "{:<20} {:<18} {:>8} {:<8} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.source,
            entry.records_written,
            entry.status.as_str(),
            truncate(&entry.error_detail, 60)
        );
    }
    Ok(())
}
