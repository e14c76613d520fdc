//! Activity normalization
//!
//! Core columns come from the activity summary; category extras come from
//! the decoded developer fields first and the provider summary second, then
//! the category extractor fills in derived metrics.

use tracing::debug;

use super::{at, num, round_to, text, value_to_f64, Normalized};
use crate::decode::{self, DeveloperFieldBlob};
use crate::error::Result;
use crate::schema::{route, Record, RecordType, Value};

pub fn type_key(payload: &serde_json::Value) -> &str {
    text(payload, &["activityType", "typeKey"]).unwrap_or_default()
}

pub fn activity_name(payload: &serde_json::Value) -> &str {
    text(payload, &["activityName"])
        .or_else(|| text(payload, &["summaryDTO", "activityName"]))
        .unwrap_or_default()
}

/// Metric from the summary, falling back to the detail's `summaryDTO`
fn metric(payload: &serde_json::Value, key: &str) -> Option<f64> {
    num(payload, &[key]).or_else(|| num(payload, &["summaryDTO", key]))
}

/// Set a column unless an earlier stage already produced it
fn fill(record: &mut Record, column: &str, value: impl Into<Value>) {
    if record.value(column).is_missing() {
        record.set_present(column, value);
    }
}

fn positive(record: &Record, column: &str) -> Option<f64> {
    record.value(column).as_f64().filter(|v| *v > 0.0)
}

fn mps_to_kmh(speed: f64) -> f64 {
    round_to(speed * 3.6, 2)
}

/// Route and normalize one activity payload
pub fn normalize_activity(payload: &serde_json::Value) -> Result<Normalized> {
    let category = route(type_key(payload), activity_name(payload));
    let variant = category.variant();
    let mut record = core_record(payload);

    if !variant.decode.is_empty() {
        let blob = DeveloperFieldBlob::from_connect_iq(payload);
        if !blob.is_empty() {
            for (column, value) in decode::decode(category, &blob).iter() {
                record.set_present(column, value.clone());
            }
        }
    }

    (variant.extract)(payload, &mut record);

    debug!(
        activity_id = %record.value("activity_id"),
        category = %category,
        "normalized activity"
    );

    Ok(Normalized {
        record_type: RecordType::Activity(category),
        record,
    })
}

/// Columns shared by every activity partition
pub fn core_record(payload: &serde_json::Value) -> Record {
    let mut record = Record::new();
    record
        .set_present(
            "date",
            text(payload, &["startTimeLocal"]).and_then(|s| s.get(..10)),
        )
        .set_present("activity_id", at(payload, &["activityId"]).map(Value::from))
        .set_present("activity_name", text(payload, &["activityName"]))
        .set_present("activity_type", text(payload, &["activityType", "typeKey"]))
        .set_present("duration_seconds", metric(payload, "duration"))
        .set_present("calories", metric(payload, "calories"))
        .set_present("avg_hr", metric(payload, "averageHR"))
        .set_present("max_hr", metric(payload, "maxHR"))
        .set_present(
            "training_effect_aerobic",
            metric(payload, "aerobicTrainingEffect"),
        )
        .set_present(
            "training_effect_anaerobic",
            metric(payload, "anaerobicTrainingEffect"),
        )
        .set_present(
            "recovery_time_hrs",
            metric(payload, "recoveryTime").map(|s| round_to(s / 3600.0, 2)),
        )
        .set_present("stress_start", metric(payload, "startStress"))
        .set_present("stress_end", metric(payload, "endStress"))
        .set_present("stress_change", metric(payload, "differenceStress"))
        .set_present(
            "body_battery_impact",
            metric(payload, "differenceBodyBattery"),
        );

    for zone in 1..=5usize {
        record.set(format!("hr_zone_{zone}_time"), zone_seconds(payload, zone));
    }

    record
}

/// Seconds in a heart-rate zone, from `hrTimeInZone_N` or the zone array
fn zone_seconds(payload: &serde_json::Value, zone: usize) -> f64 {
    metric(payload, &format!("hrTimeInZone_{zone}"))
        .or_else(|| {
            at(payload, &["timeInHeartRateZones"])
                .and_then(|zones| zones.get(zone - 1))
                .and_then(value_to_f64)
        })
        .unwrap_or(0.0)
}

pub fn no_extras(_payload: &serde_json::Value, _record: &mut Record) {}

pub fn surfing(payload: &serde_json::Value, record: &mut Record) {
    fill(record, "distance_meters", metric(payload, "distance"));
    fill(record, "total_waves", metric(payload, "totalWaves"));
    fill(record, "longest_wave_seconds", metric(payload, "longestWaveTime"));
    fill(record, "total_surf_time_seconds", metric(payload, "surfTime"));
    fill(record, "paddle_time_seconds", metric(payload, "paddleTime"));
    fill(
        record,
        "max_speed_kmh",
        metric(payload, "maxSpeed").map(mps_to_kmh),
    );
    fill(
        record,
        "avg_speed_kmh",
        metric(payload, "averageSpeed")
            .or_else(|| metric(payload, "avgSpeed"))
            .map(mps_to_kmh),
    );

    let waves = positive(record, "total_waves");
    let hours = positive(record, "duration_seconds").map(|s| s / 3600.0);
    if let (Some(waves), Some(hours)) = (waves, hours) {
        record.set("wave_frequency_per_hour", round_to(waves / hours, 1));
    }

    let surf = positive(record, "total_surf_time_seconds");
    let paddle = positive(record, "paddle_time_seconds");
    if let (Some(surf), Some(paddle)) = (surf, paddle) {
        record.set("surf_vs_paddle_ratio", round_to(surf / (surf + paddle), 2));
    }

    if let (Some(waves), Some(distance)) = (waves, positive(record, "distance_meters")) {
        record.set("avg_wave_distance", round_to(distance / waves, 1));
    }
}

pub fn swimming(payload: &serde_json::Value, record: &mut Record) {
    fill(record, "distance_meters", metric(payload, "distance"));
    fill(record, "pool_size_meters", metric(payload, "poolLength"));
    fill(record, "total_strokes", metric(payload, "strokes"));
    fill(record, "avg_swolf", metric(payload, "avgSwolf"));
    fill(
        record,
        "avg_stroke_rate_spm",
        metric(payload, "avgStrokeRate")
            .or_else(|| metric(payload, "averageSwimCadenceInStrokesPerMinute")),
    );
    fill(
        record,
        "stroke_type_primary",
        text(payload, &["strokeType"])
            .or_else(|| text(payload, &["summaryDTO", "primaryStrokeType"])),
    );
    fill(record, "total_lengths", metric(payload, "numberOfActiveLengths"));
    fill(record, "avg_distance_per_stroke", metric(payload, "avgDistancePerStroke"));

    let distance = positive(record, "distance_meters");
    if let (Some(distance), Some(strokes)) = (distance, positive(record, "total_strokes")) {
        fill(record, "avg_distance_per_stroke", round_to(distance / strokes, 2));
    }
    if let (Some(distance), Some(duration)) = (distance, positive(record, "duration_seconds")) {
        record.set("avg_pace_per_100m", round_to(duration / distance * 100.0, 2));
    }
    if let Some(swolf) = positive(record, "avg_swolf") {
        let score = (100.0 - (swolf - 30.0) * 2.0).clamp(0.0, 100.0);
        record.set("stroke_efficiency_score", score);
    }

    record.set(
        "is_open_water",
        type_key(payload).to_ascii_lowercase().contains("open_water"),
    );
}

pub fn running(payload: &serde_json::Value, record: &mut Record) {
    fill(record, "distance_meters", metric(payload, "distance"));
    fill(
        record,
        "avg_cadence_spm",
        metric(payload, "averageRunningCadenceInStepsPerMinute")
            .or_else(|| metric(payload, "avgRunCadence")),
    );
    fill(record, "avg_stride_length", metric(payload, "avgStrideLength"));
    fill(
        record,
        "vertical_oscillation_cm",
        metric(payload, "avgVerticalOscillation"),
    );
    fill(
        record,
        "ground_contact_time_ms",
        metric(payload, "avgGroundContactTime"),
    );
    fill(record, "running_power_watts", metric(payload, "avgPower"));
    fill(record, "elevation_gain_meters", metric(payload, "elevationGain"));
    fill(record, "elevation_loss_meters", metric(payload, "elevationLoss"));
    fill(record, "avg_temperature", metric(payload, "avgTemperature"));
    fill(
        record,
        "lactate_threshold_hr",
        metric(payload, "lactateThresholdHeartRate"),
    );

    if let (Some(distance), Some(duration)) = (
        positive(record, "distance_meters"),
        positive(record, "duration_seconds"),
    ) {
        // minutes per km
        record.set(
            "avg_pace_per_km",
            round_to(duration / (distance / 1000.0) / 60.0, 2),
        );
    }

    record.set(
        "is_treadmill",
        type_key(payload).to_ascii_lowercase().contains("treadmill"),
    );
}

pub fn strength(payload: &serde_json::Value, record: &mut Record) {
    fill(
        record,
        "total_sets",
        metric(payload, "totalSets").or_else(|| metric(payload, "activeSets")),
    );
    fill(record, "total_reps", metric(payload, "totalReps"));
    fill(record, "max_weight_kg", metric(payload, "maxWeight"));
    fill(record, "avg_rest_seconds", metric(payload, "avgRestTime"));

    if let Some(sets) = at(payload, &["summarizedExerciseSets"]).and_then(|v| v.as_array()) {
        record.set("exercise_count", sets.len());
        let mut groups: Vec<&str> = sets
            .iter()
            .filter_map(|s| s.get("category").and_then(|c| c.as_str()))
            .collect();
        groups.sort_unstable();
        groups.dedup();
        if !groups.is_empty() {
            record.set("primary_muscle_groups", groups.join(","));
        }
    }

    record.set("workout_type", workout_type(activity_name(payload)));
    let focus = training_focus(
        record.value("total_sets").as_f64(),
        record.value("avg_rest_seconds").as_f64(),
    );
    record.set("training_focus", focus);
}

fn workout_type(name: &str) -> &'static str {
    let name = name.to_ascii_lowercase();
    if name.contains("upper") {
        "Upper Body"
    } else if name.contains("lower") {
        "Lower Body"
    } else if name.contains("full") || name.contains("total") {
        "Full Body"
    } else if name.contains("cardio") {
        "Cardio Strength"
    } else {
        "General Strength"
    }
}

fn training_focus(total_sets: Option<f64>, avg_rest: Option<f64>) -> &'static str {
    match (avg_rest, total_sets) {
        (Some(rest), _) if rest > 180.0 => "Strength",
        (Some(rest), _) if rest < 60.0 => "Endurance",
        (_, Some(sets)) if sets > 20.0 => "Hypertrophy",
        _ => "General",
    }
}

pub fn breathwork(payload: &serde_json::Value, record: &mut Record) {
    fill(
        record,
        "avg_respiration_rate",
        metric(payload, "avgRespirationRate"),
    );
    fill(
        record,
        "min_respiration_rate",
        metric(payload, "minRespirationRate"),
    );
    fill(
        record,
        "max_respiration_rate",
        metric(payload, "maxRespirationRate"),
    );

    let name = activity_name(payload).to_ascii_lowercase();
    let technique = if name.contains("whm") {
        Some("WHM")
    } else if name.contains("box") {
        Some("Box Breathing")
    } else if name.contains("478") {
        Some("4-7-8 Breathing")
    } else {
        None
    };
    record.set_present("technique_type", technique);

    let stress_change = record.value("stress_change").as_f64().unwrap_or(0.0).abs();
    let minutes = record.value("duration_seconds").as_f64().unwrap_or(0.0) / 60.0;
    let intensity = if stress_change > 20.0 && minutes > 10.0 {
        "High"
    } else if stress_change > 10.0 || minutes > 15.0 {
        "Moderate"
    } else {
        "Light"
    };
    record.set("session_intensity", intensity);
}

pub fn recovery(payload: &serde_json::Value, record: &mut Record) {
    fill(record, "avg_temperature", metric(payload, "avgTemperature"));
    fill(record, "location", text(payload, &["locationName"]));

    let name = activity_name(payload).to_ascii_lowercase();
    let kind = type_key(payload).to_ascii_lowercase();
    let session = if name.contains("sauna") || kind.contains("sauna") {
        "Sauna"
    } else if name.contains("steam") {
        "Steam Room"
    } else if name.contains("ice") || name.contains("cold") {
        "Ice Bath"
    } else if name.contains("hot") || name.contains("tub") {
        "Hot Tub"
    } else {
        "General Recovery"
    };
    record.set("session_type", session);
}
