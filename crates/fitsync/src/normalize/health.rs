//! Daily wellness and physiological metrics

use chrono::{DateTime, NaiveDate};
use tracing::debug;

use super::{at, first_entry, num, round_to, text, value_to_f64};
use crate::error::{Result, SyncError};
use crate::schema::{Record, Value, DATE_FORMAT};

fn bundle_date(payload: &serde_json::Value, what: &str) -> Result<NaiveDate> {
    text(payload, &["date"])
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
        .ok_or_else(|| SyncError::record_invalid(format!("{what} bundle without a valid date")))
}

/// Provider timestamps in epoch milliseconds
fn epoch_millis(value: &serde_json::Value) -> Option<Value> {
    let millis = value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))?;
    DateTime::from_timestamp_millis(millis).map(|dt| Value::Timestamp(dt.naive_utc()))
}

/// Normalize a day's wellness bundle
pub fn daily_health(payload: &serde_json::Value) -> Result<Record> {
    let date = bundle_date(payload, "daily health")?;
    let mut record = Record::new().with("date", date);

    if let Some(summary) = at(payload, &["summary"]) {
        record
            .set_present("steps", num(summary, &["totalSteps"]))
            .set_present("floors_climbed", num(summary, &["floorsAscended"]))
            .set_present("active_calories", num(summary, &["activeKilocalories"]))
            .set_present(
                "avg_respiration_rate",
                num(summary, &["avgWakingRespirationValue"]),
            )
            .set_present(
                "spo2_avg",
                num(summary, &["averageSpo2"]).or_else(|| num(summary, &["averageSpo2Value"])),
            )
            .set_present("resting_heart_rate", num(summary, &["restingHeartRate"]))
            .set_present("stress_avg", num(summary, &["averageStressLevel"]))
            .set_present("stress_max", num(summary, &["maxStressLevel"]));
    }

    if let Some(stress) = at(payload, &["stress"]) {
        record
            .set_present("stress_avg", num(stress, &["avgStressLevel"]))
            .set_present("stress_max", num(stress, &["maxStressLevel"]));
    }

    if let Some(sleep) = at(payload, &["sleep"]) {
        apply_sleep(sleep, &mut record);
    }

    if let Some(hrv) = at(payload, &["hrv"]) {
        apply_hrv(hrv, &mut record);
    }

    if let Some(body_battery) = at(payload, &["body_battery"]) {
        apply_body_battery(body_battery, &mut record);
    }

    if let Some(respiration) = at(payload, &["respiration"]) {
        let highest = num(respiration, &["highestRespirationValue"]);
        let lowest = num(respiration, &["lowestRespirationValue"]);
        record
            .set_present(
                "detailed_avg_sleep_respiration",
                num(respiration, &["avgSleepRespirationValue"]),
            )
            .set_present(
                "detailed_avg_waking_respiration",
                num(respiration, &["avgWakingRespirationValue"]),
            )
            .set_present("detailed_highest_respiration", highest)
            .set_present("detailed_lowest_respiration", lowest);
        if let (Some(high), Some(low)) = (highest, lowest) {
            record.set("respiration_range", round_to(high - low, 1));
        }
    }

    Ok(record)
}

fn apply_sleep(sleep: &serde_json::Value, record: &mut Record) {
    let dto = at(sleep, &["dailySleepDTO"]).unwrap_or(sleep);

    let minutes = |key: &str| num(dto, &[key]).map(|s| s / 60.0);
    let deep = minutes("deepSleepSeconds");
    let rem = minutes("remSleepSeconds");
    let light = minutes("lightSleepSeconds");
    let awake = minutes("awakeSleepSeconds");

    record
        .set_present("sleep_score", num(dto, &["sleepScores", "overall", "value"]))
        .set_present("deep_sleep_minutes", deep)
        .set_present("rem_sleep_minutes", rem)
        .set_present("light_sleep_minutes", light)
        .set_present("awake_minutes", awake)
        .set_present(
            "sleep_start_time",
            at(dto, &["sleepStartTimestampLocal"]).and_then(epoch_millis),
        )
        .set_present(
            "sleep_end_time",
            at(dto, &["sleepEndTimestampLocal"]).and_then(epoch_millis),
        )
        .set_present("sleep_need_baseline", num(dto, &["sleepNeed", "baseline"]))
        .set_present("sleep_need_actual", num(dto, &["sleepNeed", "actual"]))
        .set_present("sleep_feedback", text(dto, &["sleepNeed", "feedback"]))
        .set_present(
            "breathing_disruption_severity",
            text(dto, &["breathingDisruptionSeverity"]),
        )
        .set_present("hrv_overnight_avg", num(sleep, &["avgOvernightHrv"]))
        .set_present("hrv_during_sleep", num(sleep, &["avgOvernightHrv"]))
        .set_present("hrv_status", text(sleep, &["hrvStatus"]))
        .set_present("resting_heart_rate", num(sleep, &["restingHeartRate"]));

    let asleep = [deep, rem, light].iter().flatten().sum::<f64>();
    let in_bed = asleep + awake.unwrap_or(0.0);
    if in_bed > 0.0 {
        record.set("sleep_efficiency", round_to(asleep / in_bed * 100.0, 1));
    }
}

fn apply_hrv(hrv: &serde_json::Value, record: &mut Record) {
    let summary = at(hrv, &["hrvSummary"]).unwrap_or(hrv);
    let last_night = num(summary, &["lastNightAvg"]).or_else(|| num(summary, &["lastNight"]));

    if record.value("hrv_overnight_avg").is_missing() {
        record.set_present("hrv_overnight_avg", last_night);
        record.set_present("hrv_during_sleep", last_night);
    }
    if record.value("hrv_status").is_missing() {
        record.set_present("hrv_status", text(summary, &["status"]));
    }
    record
        .set_present("hrv_weekly_avg", num(summary, &["weeklyAvg"]))
        .set_present("hrv_7_day_trend", text(summary, &["trendDirection"]));
}

/// Body battery: start is the day's peak, end the lowest reading after it.
///
/// Accepts either the report list (`bodyBatteryValuesArray` pairs of
/// `[epoch_millis, level]`) or a plain `startValue`/`endValue` summary.
fn apply_body_battery(value: &serde_json::Value, record: &mut Record) {
    if value.is_object() && value.get("bodyBatteryValuesArray").is_none() {
        record
            .set_present("body_battery_start", num(value, &["startValue"]))
            .set_present("body_battery_end", num(value, &["endValue"]))
            .set_present("body_battery_charged", num(value, &["totalCharged"]))
            .set_present("body_battery_drained", num(value, &["totalDrained"]));
        return;
    }

    let Some(report) = first_entry(value) else {
        return;
    };
    record
        .set_present("body_battery_charged", num(report, &["charged"]))
        .set_present("body_battery_drained", num(report, &["drained"]));

    let mut readings: Vec<(i64, f64)> = at(report, &["bodyBatteryValuesArray"])
        .and_then(|v| v.as_array())
        .map(|pairs| {
            pairs
                .iter()
                .filter_map(|pair| {
                    let ts = pair.get(0)?.as_i64()?;
                    let level = value_to_f64(pair.get(1)?)?;
                    Some((ts, level))
                })
                .collect()
        })
        .unwrap_or_default();
    readings.sort_by_key(|(ts, _)| *ts);

    if let Some((start, end)) = peak_then_low(&readings) {
        record.set("body_battery_start", start);
        record.set_present("body_battery_end", end);
    }
}

fn peak_then_low(readings: &[(i64, f64)]) -> Option<(f64, Option<f64>)> {
    match readings {
        [] => None,
        [(_, only)] => Some((*only, None)),
        _ => {
            let (peak_ts, peak) = readings
                .iter()
                .copied()
                .max_by(|a, b| a.1.total_cmp(&b.1))?;
            let low = readings
                .iter()
                .filter(|(ts, _)| *ts > peak_ts)
                .map(|(_, level)| *level)
                .min_by(f64::total_cmp)
                .or_else(|| readings.last().map(|(_, level)| *level));
            if let Some(low) = low {
                if peak - low > 60.0 {
                    debug!(peak, low, "high daily body battery drain");
                }
            }
            Some((peak, low))
        }
    }
}

/// Normalize a day's physiological bundle
pub fn physiological(payload: &serde_json::Value) -> Result<Record> {
    let date = bundle_date(payload, "physiological")?;
    let mut record = Record::new().with("date", date);

    if let Some(max_metrics) = at(payload, &["max_metrics"]).and_then(first_entry) {
        record
            .set_present(
                "vo2_max_running",
                num(max_metrics, &["generic", "vo2MaxPreciseValue"])
                    .or_else(|| num(max_metrics, &["generic", "vo2MaxValue"])),
            )
            .set_present(
                "vo2_max_cycling",
                num(max_metrics, &["cycling", "vo2MaxValue"]),
            )
            .set_present(
                "fitness_age",
                num(max_metrics, &["generic", "fitnessAge"]),
            );
    }

    if let Some(status) = at(payload, &["training_status"]) {
        apply_training_status(status, date, &mut record);
    }

    if let Some(readiness) = at(payload, &["training_readiness"]).and_then(first_entry) {
        record
            .set_present("recovery_advisor", text(readiness, &["level"]))
            .set_present(
                "performance_condition",
                num(readiness, &["performanceCondition"]),
            );
        if record.value("recovery_advisor").is_missing() {
            record.set_present(
                "recovery_advisor",
                num(readiness, &["recoveryTime"]).map(|m| format!("{}h", round_to(m / 60.0, 1))),
            );
        }
    }

    Ok(record)
}

fn apply_training_status(status: &serde_json::Value, date: NaiveDate, record: &mut Record) {
    if let Some(vo2) = at(status, &["mostRecentVO2Max"]) {
        if record.value("vo2_max_running").is_missing() {
            record.set_present("vo2_max_running", num(vo2, &["generic", "vo2MaxValue"]));
        }
        if record.value("vo2_max_cycling").is_missing() {
            record.set_present("vo2_max_cycling", num(vo2, &["cycling", "vo2MaxValue"]));
        }
        record
            .set_present(
                "altitude_acclimatization",
                num(vo2, &["heatAltitudeAcclimation", "altitudeAcclimation"]),
            )
            .set_present(
                "heat_acclimatization",
                num(vo2, &["heatAltitudeAcclimation", "heatAcclimationPercentage"]),
            );
    }

    let date_str = date.format(DATE_FORMAT).to_string();
    let latest = at(status, &["mostRecentTrainingStatus", "latestTrainingStatusData"])
        .and_then(|v| v.as_object())
        .and_then(|devices| {
            devices
                .values()
                .find(|d| text(d, &["calendarDate"]) == Some(date_str.as_str()))
                .or_else(|| devices.values().next())
        });
    if let Some(entry) = latest {
        record
            .set_present(
                "training_status",
                text(entry, &["trainingStatusFeedbackPhrase"]),
            )
            .set_present(
                "training_load_7day",
                num(entry, &["acuteTrainingLoadDTO", "dailyTrainingLoadAcute"]),
            )
            .set_present(
                "training_load_focus",
                text(entry, &["loadTunnelFocus"]).or_else(|| text(entry, &["focusType"])),
            );
    }

    let balance = at(
        status,
        &["mostRecentTrainingLoadBalance", "metricsTrainingLoadBalanceDTOMap"],
    )
    .and_then(|v| v.as_object())
    .and_then(|devices| {
        devices
            .values()
            .find(|d| d.get("primaryTrainingDevice").and_then(|p| p.as_bool()) == Some(true))
            .or_else(|| devices.values().next())
    });
    if let Some(device) = balance {
        for (column, key) in [
            ("training_load_aerobic_low", "monthlyLoadAerobicLow"),
            ("training_load_aerobic_high", "monthlyLoadAerobicHigh"),
            ("training_load_anaerobic", "monthlyLoadAnaerobic"),
            ("training_load_aerobic_low_target_min", "monthlyLoadAerobicLowTargetMin"),
            ("training_load_aerobic_low_target_max", "monthlyLoadAerobicLowTargetMax"),
            ("training_load_aerobic_high_target_min", "monthlyLoadAerobicHighTargetMin"),
            ("training_load_aerobic_high_target_max", "monthlyLoadAerobicHighTargetMax"),
            ("training_load_anaerobic_target_min", "monthlyLoadAnaerobicTargetMin"),
            ("training_load_anaerobic_target_max", "monthlyLoadAnaerobicTargetMax"),
        ] {
            record.set_present(column, num(device, &[key]));
        }
        record.set_present(
            "training_balance_feedback",
            text(device, &["trainingBalanceFeedbackPhrase"]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_daily_health_requires_date() {
        assert!(matches!(
            daily_health(&json!({"summary": {}})),
            Err(SyncError::RecordInvalid(_))
        ));
    }

    #[test]
    fn test_sleep_stages_and_efficiency() {
        let payload = json!({
            "date": "2024-01-05",
            "sleep": {
                "dailySleepDTO": {
                    "deepSleepSeconds": 3600,
                    "remSleepSeconds": 5400,
                    "lightSleepSeconds": 14400,
                    "awakeSleepSeconds": 1800,
                    "sleepScores": {"overall": {"value": 82}},
                    "sleepStartTimestampLocal": 1704412800000i64
                },
                "avgOvernightHrv": 48.0,
                "hrvStatus": "BALANCED"
            }
        });
        let record = daily_health(&payload).unwrap();
        assert_eq!(record.value("deep_sleep_minutes"), &Value::Float(60.0));
        assert_eq!(record.value("awake_minutes"), &Value::Float(30.0));
        assert_eq!(record.value("sleep_efficiency"), &Value::Float(92.9));
        assert_eq!(record.value("sleep_score"), &Value::Float(82.0));
        assert_eq!(record.value("hrv_status").as_str(), Some("BALANCED"));
        assert_eq!(
            record.value("sleep_start_time").render(),
            "2024-01-05T00:00:00"
        );
    }

    #[test]
    fn test_hrv_summary_fills_gaps_only() {
        let payload = json!({
            "date": "2024-01-05",
            "hrv": {"hrvSummary": {"weeklyAvg": 51, "lastNightAvg": 47, "status": "BALANCED"}}
        });
        let record = daily_health(&payload).unwrap();
        assert_eq!(record.value("hrv_weekly_avg"), &Value::Float(51.0));
        assert_eq!(record.value("hrv_overnight_avg"), &Value::Float(47.0));
    }

    #[test]
    fn test_body_battery_peak_then_low() {
        let payload = json!({
            "date": "2024-01-05",
            "body_battery": [{
                "charged": 60,
                "drained": 55,
                "bodyBatteryValuesArray": [
                    [1000, 30], [4000, 60], [2000, 85], [3000, 70], [5000, 25]
                ]
            }]
        });
        let record = daily_health(&payload).unwrap();
        assert_eq!(record.value("body_battery_start"), &Value::Float(85.0));
        assert_eq!(record.value("body_battery_end"), &Value::Float(25.0));
        assert_eq!(record.value("body_battery_charged"), &Value::Float(60.0));
    }

    #[test]
    fn test_body_battery_summary_shape() {
        let payload = json!({
            "date": "2024-01-05",
            "body_battery": {"startValue": 80, "endValue": 30}
        });
        let record = daily_health(&payload).unwrap();
        assert_eq!(record.value("body_battery_start"), &Value::Float(80.0));
        assert_eq!(record.value("body_battery_end"), &Value::Float(30.0));
    }

    #[test]
    fn test_respiration_range() {
        let payload = json!({
            "date": "2024-01-05",
            "respiration": {"highestRespirationValue": 21.0, "lowestRespirationValue": 9.5}
        });
        let record = daily_health(&payload).unwrap();
        assert_eq!(record.value("respiration_range"), &Value::Float(11.5));
    }

    #[test]
    fn test_physiological_bundle() {
        let payload = json!({
            "date": "2024-01-05",
            "max_metrics": [{"generic": {"vo2MaxValue": 52.0, "fitnessAge": 31}}],
            "training_status": {
                "mostRecentTrainingStatus": {
                    "latestTrainingStatusData": {
                        "123": {"calendarDate": "2024-01-05", "trainingStatusFeedbackPhrase": "PRODUCTIVE_1"}
                    }
                },
                "mostRecentTrainingLoadBalance": {
                    "metricsTrainingLoadBalanceDTOMap": {
                        "123": {"primaryTrainingDevice": true, "monthlyLoadAnaerobic": 210.0,
                                "trainingBalanceFeedbackPhrase": "BALANCED"}
                    }
                }
            },
            "training_readiness": [{"level": "HIGH", "performanceCondition": 3}]
        });
        let record = physiological(&payload).unwrap();
        assert_eq!(record.value("vo2_max_running"), &Value::Float(52.0));
        assert_eq!(record.value("fitness_age"), &Value::Float(31.0));
        assert_eq!(record.value("training_status").as_str(), Some("PRODUCTIVE_1"));
        assert_eq!(record.value("training_load_anaerobic"), &Value::Float(210.0));
        assert_eq!(record.value("training_balance_feedback").as_str(), Some("BALANCED"));
        assert_eq!(record.value("recovery_advisor").as_str(), Some("HIGH"));
    }
}
