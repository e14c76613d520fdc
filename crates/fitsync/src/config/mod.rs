//! Runtime configuration from the environment
//!
//! Every provider is optional: a source whose credentials are absent is
//! reported as skipped rather than failed.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SyncError};

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_GARMIN_BASE_URL: &str = "https://connectapi.garmin.com";
pub const DEFAULT_GITHUB_BASE_URL: &str = "https://api.github.com";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
const DEFAULT_MIN_REQUEST_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GarminSettings {
    pub access_token: String,
    pub base_url: String,
    /// Required by the wellness endpoints; looked up from the profile when absent
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubSettings {
    pub username: String,
    pub token: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub http_timeout: Duration,
    pub min_request_delay: Duration,
    pub garmin: Option<GarminSettings>,
    /// Path to a smart-scale CSV export
    pub body_composition_export: Option<PathBuf>,
    pub github: Option<GithubSettings>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let garmin = get("GARMIN_ACCESS_TOKEN").map(|access_token| GarminSettings {
            access_token,
            base_url: get("GARMIN_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GARMIN_BASE_URL.to_string()),
            display_name: get("GARMIN_DISPLAY_NAME"),
        });

        let github = match (get("GITHUB_USERNAME"), get("GITHUB_TOKEN")) {
            (Some(username), Some(token)) => Some(GithubSettings {
                username,
                token,
                base_url: get("GITHUB_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GITHUB_BASE_URL.to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            data_dir: get("FITSYNC_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            http_timeout: Duration::from_secs(parse_number(
                "FITSYNC_HTTP_TIMEOUT_SECS",
                get("FITSYNC_HTTP_TIMEOUT_SECS"),
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            min_request_delay: Duration::from_millis(parse_number(
                "FITSYNC_MIN_REQUEST_DELAY_MS",
                get("FITSYNC_MIN_REQUEST_DELAY_MS"),
                DEFAULT_MIN_REQUEST_DELAY_MS,
            )?),
            garmin,
            body_composition_export: get("BODY_COMPOSITION_EXPORT").map(PathBuf::from),
            github,
        })
    }
}

fn parse_number(key: &str, raw: Option<String>, default: u64) -> Result<u64> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| SyncError::config(format!("{key} must be a whole number, got {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.data_dir, PathBuf::from("./data"));
        assert_eq!(s.http_timeout, Duration::from_secs(20));
        assert_eq!(s.min_request_delay, Duration::from_millis(2000));
        assert!(s.garmin.is_none());
        assert!(s.github.is_none());
        assert!(s.body_composition_export.is_none());
    }

    #[test]
    fn test_garmin_from_token() {
        let s = settings(&[
            ("GARMIN_ACCESS_TOKEN", "abc"),
            ("GARMIN_DISPLAY_NAME", "surfer"),
        ])
        .unwrap();
        let garmin = s.garmin.unwrap();
        assert_eq!(garmin.access_token, "abc");
        assert_eq!(garmin.base_url, DEFAULT_GARMIN_BASE_URL);
        assert_eq!(garmin.display_name.as_deref(), Some("surfer"));
    }

    #[test]
    fn test_github_needs_both_credentials() {
        assert!(settings(&[("GITHUB_USERNAME", "me")]).unwrap().github.is_none());
        let s = settings(&[("GITHUB_USERNAME", "me"), ("GITHUB_TOKEN", "t")]).unwrap();
        assert_eq!(s.github.unwrap().base_url, DEFAULT_GITHUB_BASE_URL);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let s = settings(&[("GARMIN_ACCESS_TOKEN", "  "), ("FITSYNC_DATA_DIR", "")]).unwrap();
        assert!(s.garmin.is_none());
        assert_eq!(s.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let err = settings(&[("FITSYNC_HTTP_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
