//! Provider adapters
//!
//! A [`Source`] turns a [`SyncWindow`] into raw provider items. Sources never
//! touch storage; the sync engine normalizes and merges what they return.

pub mod body_composition;
pub mod garmin;
pub mod github;

use std::fmt;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

use crate::client::ApiClient;
use crate::config::Settings;
use crate::error::{Result, SyncError};
use crate::normalize::RawItem;
use crate::sync::{RateLimiter, SyncWindow};

pub use body_composition::BodyCompositionSource;
pub use garmin::GarminSource;
pub use github::GithubSource;

/// A failed sub-request of a source that still returned other data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    /// What was being fetched, e.g. `daily_health 2024-01-05`
    pub what: String,
    pub detail: String,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.what, self.detail)
    }
}

/// Items fetched for one window
#[derive(Debug, Default)]
pub struct FetchOutput {
    pub items: Vec<RawItem>,
    pub failures: Vec<FetchFailure>,
}

impl FetchOutput {
    pub fn new(items: Vec<RawItem>) -> Self {
        Self {
            items,
            failures: Vec::new(),
        }
    }

    pub fn fail(&mut self, what: impl Into<String>, error: &SyncError) {
        let failure = FetchFailure {
            what: what.into(),
            detail: error.to_string(),
        };
        warn!(failure = %failure, "fetch failed");
        self.failures.push(failure);
    }

    /// Turn a fetch where nothing succeeded into a source failure
    pub fn into_result(self, source: &str) -> Result<Self> {
        if self.items.is_empty() && !self.failures.is_empty() {
            let detail = self
                .failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SyncError::source_unavailable(source, detail));
        }
        Ok(self)
    }
}

#[async_trait]
pub trait Source: Send + Sync {
    /// Name written to the run log
    fn name(&self) -> &str;

    async fn fetch(&self, window: &SyncWindow) -> Result<FetchOutput>;
}

/// A configured source, or the reason it is switched off
pub enum SourceSlot {
    Enabled(Box<dyn Source>),
    Disabled { name: &'static str, reason: String },
}

impl SourceSlot {
    pub fn name(&self) -> &str {
        match self {
            SourceSlot::Enabled(source) => source.name(),
            SourceSlot::Disabled { name, .. } => *name,
        }
    }
}

/// Build every source in run order from settings
pub fn from_settings(settings: &Settings) -> Result<Vec<SourceSlot>> {
    let mut slots = Vec::with_capacity(3);

    slots.push(match &settings.garmin {
        Some(garmin) => SourceSlot::Enabled(Box::new(GarminSource::new(
            garmin,
            settings.http_timeout,
            settings.min_request_delay,
        )?)),
        None => SourceSlot::Disabled {
            name: garmin::NAME,
            reason: "GARMIN_ACCESS_TOKEN not set".to_string(),
        },
    });

    slots.push(match &settings.body_composition_export {
        Some(path) => SourceSlot::Enabled(Box::new(BodyCompositionSource::new(path))),
        None => SourceSlot::Disabled {
            name: body_composition::NAME,
            reason: "BODY_COMPOSITION_EXPORT not set".to_string(),
        },
    });

    slots.push(match &settings.github {
        Some(github) => SourceSlot::Enabled(Box::new(GithubSource::new(
            github,
            settings.http_timeout,
            settings.min_request_delay,
        )?)),
        None => SourceSlot::Disabled {
            name: github::NAME,
            reason: "GITHUB_USERNAME or GITHUB_TOKEN not set".to_string(),
        },
    });

    Ok(slots)
}

/// API client paced by a rate limiter, retrying on HTTP 429
pub(crate) struct PacedClient {
    client: ApiClient,
    limiter: Mutex<RateLimiter>,
}

impl PacedClient {
    pub(crate) fn new(client: ApiClient, limiter: RateLimiter) -> Self {
        Self {
            client,
            limiter: Mutex::new(limiter),
        }
    }

    /// GET a JSON document; `None` when the provider has nothing for it
    pub(crate) async fn get_optional(&self, path: &str) -> Result<Option<serde_json::Value>> {
        let mut limiter = self.limiter.lock().await;
        loop {
            limiter.wait().await;
            match self.client.get_optional(path).await {
                Err(SyncError::RateLimited) => {
                    limiter.on_rate_limit();
                    if limiter.should_give_up() {
                        return Err(SyncError::RateLimited);
                    }
                }
                result => {
                    if result.is_ok() {
                        limiter.on_success();
                    }
                    return result;
                }
            }
        }
    }

    /// GET a JSON document that must exist
    pub(crate) async fn get(&self, path: &str) -> Result<serde_json::Value> {
        self.get_optional(path)
            .await?
            .ok_or_else(|| SyncError::invalid_response(format!("empty response from {path}")))
    }
}
