//! Smart-scale CSV export import

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{FetchOutput, Source};
use crate::error::{Result, SyncError};
use crate::normalize::body::row_timestamp;
use crate::normalize::{ItemKind, RawItem};
use crate::sync::SyncWindow;

pub const NAME: &str = "body_composition";

pub struct BodyCompositionSource {
    export_path: PathBuf,
}

impl BodyCompositionSource {
    pub fn new(export_path: &Path) -> Self {
        Self {
            export_path: export_path.to_path_buf(),
        }
    }

    fn read_rows(&self) -> Result<Vec<Map<String, Value>>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.export_path)?;
        let headers = reader.headers()?.clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row: Map<String, Value> = headers
                .iter()
                .zip(record.iter())
                .map(|(h, cell)| (h.to_string(), Value::String(cell.to_string())))
                .collect();
            rows.push(row);
        }
        Ok(rows)
    }
}

#[async_trait]
impl Source for BodyCompositionSource {
    fn name(&self) -> &str {
        NAME
    }

    /// Rows measured inside the window, oldest first so the day's last
    /// weigh-in wins the merge. Rows without a readable time are passed
    /// through and rejected by normalization.
    async fn fetch(&self, window: &SyncWindow) -> Result<FetchOutput> {
        if !self.export_path.exists() {
            return Err(SyncError::source_unavailable(
                NAME,
                format!("export not found at {}", self.export_path.display()),
            ));
        }
        let rows = self
            .read_rows()
            .map_err(|e| SyncError::source_unavailable(NAME, e.to_string()))?;
        let total = rows.len();

        let mut dated: Vec<_> = rows
            .into_iter()
            .map(|row| (row_timestamp(&row), row))
            .filter(|(ts, _)| ts.map_or(true, |ts| window.contains(ts.date())))
            .collect();
        dated.sort_by_key(|(ts, _)| *ts);

        let items: Vec<RawItem> = dated
            .into_iter()
            .map(|(_, row)| RawItem::new(ItemKind::BodyMeasurement, Value::Object(row)))
            .collect();
        debug!(path = %self.export_path.display(), total, "read scale export");
        info!(items = items.len(), "body composition fetch complete");
        Ok(FetchOutput::new(items))
    }
}
