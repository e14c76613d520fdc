//! GitHub coding activity
//!
//! Lists the user's repositories, then their commits inside the window,
//! grouped into one payload per commit day.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{FetchOutput, PacedClient, Source};
use crate::client::ApiClient;
use crate::config::GithubSettings;
use crate::error::{Result, SyncError};
use crate::normalize::{ItemKind, RawItem};
use crate::sync::{RateLimiter, SyncWindow};

pub const NAME: &str = "github";

const PER_PAGE: usize = 100;

/// Repository fields carried onto each commit
#[derive(Debug, Clone)]
struct Repo {
    full_name: String,
    name: String,
    language: Option<String>,
    description: Option<String>,
    pushed_at: Option<NaiveDate>,
}

pub struct GithubSource {
    http: PacedClient,
    username: String,
}

impl GithubSource {
    pub fn new(settings: &GithubSettings, timeout: Duration, min_delay: Duration) -> Result<Self> {
        let client = ApiClient::new(&settings.base_url, &settings.token, timeout)?;
        Ok(Self {
            http: PacedClient::new(client, RateLimiter::new(min_delay)),
            username: settings.username.clone(),
        })
    }

    /// Page through a list endpoint until a short page
    async fn paged(&self, base: &str) -> Result<Vec<Value>> {
        let separator = if base.contains('?') { '&' } else { '?' };
        let mut all = Vec::new();
        for page in 1.. {
            let path = format!("{base}{separator}per_page={PER_PAGE}&page={page}");
            let Some(Value::Array(items)) = self.http.get_optional(&path).await? else {
                break;
            };
            let len = items.len();
            all.extend(items);
            if len < PER_PAGE {
                break;
            }
        }
        Ok(all)
    }

    async fn repositories(&self) -> Result<Vec<Repo>> {
        let repos = self.paged("/user/repos?affiliation=owner&sort=pushed").await?;
        Ok(repos.iter().filter_map(parse_repo).collect())
    }

    async fn commits(&self, repo: &Repo, window: &SyncWindow) -> Result<Vec<Value>> {
        let base = format!(
            "/repos/{}/commits?author={}&since={}T00:00:00Z&until={}T23:59:59Z",
            repo.full_name, self.username, window.start, window.end
        );
        match self.paged(&base).await {
            // empty repositories answer 409
            Err(SyncError::Api { status: 409, .. }) => Ok(Vec::new()),
            other => other,
        }
    }
}

#[async_trait]
impl Source for GithubSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, window: &SyncWindow) -> Result<FetchOutput> {
        let repos = self
            .repositories()
            .await
            .map_err(|e| SyncError::source_unavailable(NAME, e.to_string()))?;

        let mut output = FetchOutput::default();
        let mut days: BTreeMap<NaiveDate, Vec<Value>> = BTreeMap::new();

        for repo in repos
            .iter()
            .filter(|r| r.pushed_at.map_or(true, |d| d >= window.start))
        {
            match self.commits(repo, window).await {
                Ok(commits) => {
                    debug!(repo = %repo.full_name, commits = commits.len(), "fetched commits");
                    for commit in &commits {
                        if let Some((date, entry)) = commit_entry(repo, commit) {
                            if window.contains(date) {
                                days.entry(date).or_default().push(entry);
                            }
                        }
                    }
                }
                Err(e) => output.fail(format!("commits {}", repo.full_name), &e),
            }
        }

        output.items = days
            .into_iter()
            .map(|(date, commits)| {
                RawItem::new(
                    ItemKind::CodingDay,
                    json!({"date": date.to_string(), "commits": commits}),
                )
            })
            .collect();
        info!(days = output.items.len(), "github fetch complete");
        output.into_result(NAME)
    }
}

fn parse_repo(value: &Value) -> Option<Repo> {
    let text = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_string);
    Some(Repo {
        full_name: text("full_name")?,
        name: text("name")?,
        language: text("language"),
        description: text("description"),
        pushed_at: value
            .get("pushed_at")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.date_naive()),
    })
}

/// Commit day plus the per-commit payload expected by the coding normalizer
fn commit_entry(repo: &Repo, commit: &Value) -> Option<(NaiveDate, Value)> {
    let raw = commit.pointer("/commit/author/date")?.as_str()?;
    let when = DateTime::parse_from_rfc3339(raw).ok()?;
    let entry = json!({
        "repo": repo.name,
        "time": when.format("%H:%M").to_string(),
        "language": repo.language,
        "description": repo.description,
        "additions": commit.pointer("/stats/additions"),
        "deletions": commit.pointer("/stats/deletions"),
    });
    Some((when.date_naive(), entry))
}
