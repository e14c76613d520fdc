//! Aggregates computed from already persisted partitions
//!
//! Weekly heart-rate zone distribution comes from the activity partitions,
//! recovery trends from the daily health history. Both are returned as plain
//! records and merged like any fetched data.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

use crate::error::Result;
use crate::normalize::round_to;
use crate::schema::{ActivityCategory, Record, RecordType};
use crate::storage::PartitionStore;

use super::SyncWindow;

/// Daily health rows needed before a recovery trend is computed
pub const MIN_TREND_HISTORY: usize = 7;

/// Monday of the ISO week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Weekly and recovery aggregates for every week/day the window touches
pub fn derive_records(
    store: &PartitionStore,
    window: &SyncWindow,
) -> Result<Vec<(RecordType, Record)>> {
    let mut activities = Vec::new();
    for category in ActivityCategory::ALL {
        for row in store.read(RecordType::Activity(category))? {
            activities.push((category, row.record));
        }
    }
    let health: Vec<Record> = store
        .read(RecordType::DailyHealth)?
        .into_iter()
        .map(|row| row.record)
        .collect();

    let mut derived: Vec<(RecordType, Record)> = weekly_training_zones(&activities, window)
        .into_iter()
        .map(|r| (RecordType::WeeklyTrainingZones, r))
        .collect();
    derived.extend(
        recovery_trends(&health, window)
            .into_iter()
            .map(|r| (RecordType::RecoveryTrends, r)),
    );
    debug!(records = derived.len(), "derived aggregates");
    Ok(derived)
}

#[derive(Debug, Default)]
struct WeekTotals {
    training_minutes: f64,
    zone_minutes: [f64; 5],
    swimming: f64,
    strength: f64,
    aerobic: f64,
    load: f64,
}

/// One record per ISO week overlapping the window that has activities
pub fn weekly_training_zones(
    activities: &[(ActivityCategory, Record)],
    window: &SyncWindow,
) -> Vec<Record> {
    let first_week = week_start(window.start);
    let mut weeks: BTreeMap<NaiveDate, WeekTotals> = BTreeMap::new();

    for (category, activity) in activities {
        let Some(date) = activity.value("date").as_date() else {
            continue;
        };
        if date < first_week || date > window.end {
            continue;
        }
        let totals = weeks.entry(week_start(date)).or_default();
        let minutes = activity.value("duration_seconds").as_f64().unwrap_or(0.0) / 60.0;
        totals.training_minutes += minutes;

        let activity_type = activity
            .value("activity_type")
            .as_str()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match category {
            ActivityCategory::Swimming => totals.swimming += minutes,
            ActivityCategory::Strength => totals.strength += minutes,
            ActivityCategory::Running => totals.aerobic += minutes,
            _ if activity_type.contains("cycling") || activity_type.contains("cardio") => {
                totals.aerobic += minutes
            }
            _ => {}
        }

        for (zone, total) in totals.zone_minutes.iter_mut().enumerate() {
            let column = format!("hr_zone_{}_time", zone + 1);
            *total += activity.value(&column).as_f64().unwrap_or(0.0) / 60.0;
        }
        totals.load += ["training_effect_aerobic", "training_effect_anaerobic"]
            .iter()
            .filter_map(|c| activity.value(c).as_f64())
            .sum::<f64>();
    }

    weeks
        .into_iter()
        .map(|(monday, totals)| {
            let mut record = Record::new()
                .with("week_start_date", monday)
                .with("week_end_date", monday + Duration::days(6))
                .with("total_training_time_minutes", round_to(totals.training_minutes, 1))
                .with("total_swimming_time", round_to(totals.swimming, 1))
                .with("total_strength_time", round_to(totals.strength, 1))
                .with("total_aerobic_time", round_to(totals.aerobic, 1))
                .with("weekly_training_load", round_to(totals.load, 1));

            let zone_total: f64 = totals.zone_minutes.iter().sum();
            for (i, minutes) in totals.zone_minutes.iter().enumerate() {
                let zone = i + 1;
                let share = if zone_total > 0.0 {
                    round_to(minutes / zone_total * 100.0, 1)
                } else {
                    0.0
                };
                record
                    .set(format!("zone_{zone}_time_minutes"), round_to(*minutes, 1))
                    .set(format!("zone_{zone}_percentage"), share);
            }
            record
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean of the last `n` values, if there are at least `n`
fn trailing_mean(values: &[f64], n: usize) -> Option<f64> {
    (values.len() >= n).then(|| round_to(mean(&values[values.len() - n..]), 1))
}

/// Compare the last week with the week before it
fn week_over_week(values: &[f64]) -> Option<(f64, f64)> {
    (values.len() >= 14).then(|| {
        let n = values.len();
        (mean(&values[n - 7..]), mean(&values[n - 14..n - 7]))
    })
}

fn column_series(history: &[&Record], column: &str, nonzero: bool) -> Vec<f64> {
    history
        .iter()
        .filter_map(|r| r.value(column).as_f64())
        .filter(|v| !nonzero || *v != 0.0)
        .collect()
}

fn band(value: Option<f64>, high: f64, mid: f64, higher_is_better: bool) -> u32 {
    match value {
        Some(v) if higher_is_better && v > high => 20,
        Some(v) if higher_is_better && v > mid => 15,
        Some(v) if !higher_is_better && v < high => 20,
        Some(v) if !higher_is_better && v < mid => 15,
        _ => 5,
    }
}

/// Recovery trend for one day from the health history up to and including it
pub fn recovery_trend(date: NaiveDate, history: &[&Record]) -> Record {
    let hrv = column_series(history, "hrv_overnight_avg", false);
    let sleep = column_series(history, "sleep_score", true);
    let sleep_efficiency = column_series(history, "sleep_efficiency", true);
    let rhr = column_series(history, "resting_heart_rate", false);
    let body_battery = column_series(history, "body_battery_end", true);
    let stress = column_series(history, "stress_avg", true);

    let hrv_trend = week_over_week(&hrv).map(|(recent, previous)| {
        if recent > previous * 1.05 {
            "INCREASING"
        } else if recent < previous * 0.95 {
            "DECREASING"
        } else {
            "STABLE"
        }
    });
    let rhr_trend = week_over_week(&rhr).map(|(recent, previous)| {
        if recent < previous * 0.97 {
            "IMPROVING"
        } else if recent > previous * 1.03 {
            "DECLINING"
        } else {
            "STABLE"
        }
    });

    let sleep_7 = trailing_mean(&sleep, 7);
    let body_battery_7 = trailing_mean(&body_battery, 7);
    let stress_7 = trailing_mean(&stress, 7);

    let trend_points = |trend: Option<&str>, good: &str| match trend {
        Some(t) if t == good => 20,
        Some("STABLE") => 15,
        _ => 5,
    };
    let score = trend_points(hrv_trend, "INCREASING")
        + trend_points(rhr_trend, "IMPROVING")
        + band(sleep_7, 75.0, 60.0, true)
        + band(body_battery_7, 70.0, 50.0, true)
        + band(stress_7, 30.0, 50.0, false);
    let readiness = if score >= 85 {
        "OPTIMAL"
    } else if score >= 70 {
        "GOOD"
    } else if score >= 50 {
        "MODERATE"
    } else {
        "LOW"
    };

    let mut record = Record::new().with("date", date);
    record
        .set("hrv_7_day_avg", trailing_mean(&hrv, 7))
        .set("hrv_14_day_avg", trailing_mean(&hrv, 14))
        .set("hrv_30_day_avg", trailing_mean(&hrv, 30))
        .set("hrv_trend_direction", hrv_trend)
        .set("sleep_efficiency_7_day_avg", trailing_mean(&sleep_efficiency, 7))
        .set("sleep_efficiency_14_day_avg", trailing_mean(&sleep_efficiency, 14))
        .set("sleep_score_7_day_avg", sleep_7)
        .set("sleep_score_14_day_avg", trailing_mean(&sleep, 14))
        .set("rhr_7_day_avg", trailing_mean(&rhr, 7))
        .set("rhr_14_day_avg", trailing_mean(&rhr, 14))
        .set("rhr_trend_direction", rhr_trend)
        .set("body_battery_avg_7_day", body_battery_7)
        .set("stress_avg_7_day", stress_7)
        .set("recovery_score", f64::from(score))
        .set("training_readiness", readiness);
    record
}

/// Trends for each window day that has a health record and enough history
pub fn recovery_trends(health: &[Record], window: &SyncWindow) -> Vec<Record> {
    let mut dated: Vec<(NaiveDate, &Record)> = health
        .iter()
        .filter_map(|r| r.value("date").as_date().map(|d| (d, r)))
        .collect();
    dated.sort_by_key(|(d, _)| *d);

    dated
        .iter()
        .enumerate()
        .filter(|(_, (date, _))| window.contains(*date))
        .filter(|(i, _)| i + 1 >= MIN_TREND_HISTORY)
        .map(|(i, (date, _))| {
            let history: Vec<&Record> = dated[..=i].iter().map(|(_, r)| *r).collect();
            recovery_trend(*date, &history)
        })
        .collect()
}
