//! Daily coding activity aggregates

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};

use super::{num, round_to, text};
use crate::error::{Result, SyncError};
use crate::schema::{Record, DATE_FORMAT};

const REPOS_LIST_LIMIT: usize = 100;

/// Coarse repository category from its name and description
pub fn categorize_repo(name: &str, description: &str) -> &'static str {
    const TRAINING: &[&str] = &["training", "analysis", "data", "pipeline", "surf", "garmin"];
    const WORK: &[&str] = &[
        "api", "service", "backend", "frontend", "client", "server", "prod", "staging",
    ];
    const PERSONAL: &[&str] = &[
        "personal", "blog", "portfolio", "learning", "tutorial", "experiment",
    ];

    let haystack = format!("{} {}", name, description).to_ascii_lowercase();
    let any = |keys: &[&str]| keys.iter().any(|k| haystack.contains(k));
    if any(TRAINING) {
        "training"
    } else if any(WORK) {
        "work"
    } else if any(PERSONAL) {
        "personal"
    } else {
        "other"
    }
}

fn most_common(counts: &BTreeMap<String, usize>) -> Option<&str> {
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(k, _)| k.as_str())
}

fn commit_time(commit: &serde_json::Value) -> Option<NaiveTime> {
    let raw = text(commit, &["time"])?;
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Aggregate one day of commits.
///
/// Payload: `{"date": "YYYY-MM-DD", "commits": [{"repo", "time" (HH:MM),
/// "language", "description", "additions", "deletions"}]}`.
pub fn coding_day(payload: &serde_json::Value) -> Result<Record> {
    let date = text(payload, &["date"])
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
        .ok_or_else(|| SyncError::record_invalid("coding day without a valid date"))?;
    let commits = payload
        .get("commits")
        .and_then(|c| c.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut repos = BTreeSet::new();
    let mut languages: BTreeMap<String, usize> = BTreeMap::new();
    let mut categories: BTreeMap<String, usize> = BTreeMap::new();
    let mut times = Vec::new();
    let mut added = 0i64;
    let mut deleted = 0i64;

    for commit in commits {
        let repo = text(commit, &["repo"]).unwrap_or("unknown");
        repos.insert(repo.to_string());
        let language = text(commit, &["language"])
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "unknown".to_string());
        *languages.entry(language).or_default() += 1;
        let category = categorize_repo(repo, text(commit, &["description"]).unwrap_or_default());
        *categories.entry(category.to_string()).or_default() += 1;
        if let Some(time) = commit_time(commit) {
            times.push(time);
        }
        added += num(commit, &["additions"]).unwrap_or(0.0) as i64;
        deleted += num(commit, &["deletions"]).unwrap_or(0.0) as i64;
    }

    let first = times.iter().min().copied();
    let last = times.iter().max().copied();
    let span_hours = match (first, last) {
        (Some(first), Some(last)) if times.len() > 1 => {
            (last - first).num_seconds() as f64 / 3600.0
        }
        _ => 0.0,
    };
    let count = commits.len();
    let frequency = if span_hours > 0.0 {
        round_to(count as f64 / span_hours, 2)
    } else {
        count as f64
    };
    let focus = if repos.is_empty() {
        0.0
    } else {
        round_to(1.0 / repos.len() as f64, 3)
    };
    let mut repos_list = repos.iter().cloned().collect::<Vec<_>>().join(",");
    if repos_list.len() > REPOS_LIST_LIMIT {
        let mut cut = REPOS_LIST_LIMIT;
        while !repos_list.is_char_boundary(cut) {
            cut -= 1;
        }
        repos_list.truncate(cut);
    }

    let mut record = Record::new().with("date", date);
    record
        .set("commits_count", count)
        .set("repos_active", repos.len())
        .set("lines_added", added)
        .set("lines_deleted", deleted)
        .set_present("first_commit_time", first.map(|t| t.format("%H:%M").to_string()))
        .set_present("last_commit_time", last.map(|t| t.format("%H:%M").to_string()))
        .set("work_span_hours", round_to(span_hours, 2))
        .set("commit_frequency", frequency)
        .set("focus_score", focus)
        .set("primary_language", most_common(&languages).unwrap_or("none"))
        .set("primary_category", most_common(&categories).unwrap_or("none"))
        .set("languages_count", languages.len())
        .set(
            "late_night_commits",
            times.iter().filter(|t| t.hour() >= 22).count(),
        )
        .set(
            "is_weekend",
            matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        )
        .set("repos_list", repos_list);
    Ok(record)
}
