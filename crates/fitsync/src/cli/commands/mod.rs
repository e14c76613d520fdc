pub mod log;
pub mod schema;
pub mod status;
pub mod sync;

pub use log::show as show_log;
pub use schema::show as show_schema;
pub use status::show as show_status;
pub use sync::run as sync_run;

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::config::Settings;
use crate::error::{Result, SyncError};
use crate::schema::DATE_FORMAT;

/// Parse a `YYYY-MM-DD` command-line date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| SyncError::InvalidDateFormat(s.to_string()))
}

/// Data directory from the command line, falling back to the environment
fn resolve_data_dir(data_dir: Option<PathBuf>) -> Result<PathBuf> {
    match data_dir {
        Some(dir) => Ok(dir),
        None => Ok(Settings::from_env()?.data_dir),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-10").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        );
        assert!(matches!(
            parse_date("10/03/2024"),
            Err(SyncError::InvalidDateFormat(_))
        ));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer detail", 10), "a much ...");
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let dir = resolve_data_dir(Some(PathBuf::from("/tmp/elsewhere"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/elsewhere"));
    }
}
