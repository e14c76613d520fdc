//! Sync command

use std::path::PathBuf;

use chrono::Local;

use crate::config::Settings;
use crate::error::Result;
use crate::sources;
use crate::storage::Storage;
use crate::sync::{SyncEngine, SyncOptions};

use super::parse_date;

/// Run one sync over every configured source
pub async fn run(data_dir: Option<PathBuf>, today: Option<String>, dry_run: bool) -> Result<()> {
    let mut settings = Settings::from_env()?;
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }

    let today = match today {
        Some(s) => parse_date(&s)?,
        None => Local::now().date_naive(),
    };

    println!("Using data directory: {}", settings.data_dir.display());
    if dry_run {
        println!("Dry run mode - no changes will be made");
    }

    let storage = Storage::open(&settings.data_dir)?;
    let engine = SyncEngine::new(storage, sources::from_settings(&settings)?);

    let mut opts = SyncOptions::new(today);
    opts.dry_run = dry_run;

    println!("Starting sync...");
    let summary = engine.run(opts).await?;
    println!("\n{}", summary);

    if summary.has_failures() {
        println!("\nSome sources failed; see `fitsync log` for details.");
    }
    Ok(())
}
