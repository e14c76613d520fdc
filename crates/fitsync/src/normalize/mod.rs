//! Record normalizer
//!
//! Maps one raw provider item into a flat [`Record`] bound to a
//! [`RecordType`]. The result is not yet projected: unknown columns are
//! still present and dropped later by the merge engine.

pub mod activity;
pub mod body;
pub mod coding;
pub mod health;

use std::fmt;

use crate::error::Result;
use crate::schema::{Record, RecordType};

/// What kind of provider payload a [`RawItem`] carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// One activity summary, optionally merged with its detail payload
    Activity,
    /// A day's wellness bundle (`summary`, `sleep`, `stress`, `body_battery`, ...)
    DailyHealth,
    /// A day's fitness bundle (`max_metrics`, `training_status`, `training_readiness`)
    Physiological,
    /// One row of a smart-scale export, keyed by the export's header names
    BodyMeasurement,
    /// One day of commits
    CodingDay,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemKind::Activity => "activity",
            ItemKind::DailyHealth => "daily_health",
            ItemKind::Physiological => "physiological",
            ItemKind::BodyMeasurement => "body_measurement",
            ItemKind::CodingDay => "coding_day",
        };
        f.write_str(name)
    }
}

/// A provider-native response, as fetched
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub kind: ItemKind,
    pub payload: serde_json::Value,
}

impl RawItem {
    pub fn new(kind: ItemKind, payload: serde_json::Value) -> Self {
        Self { kind, payload }
    }
}

/// A record routed to its partition
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub record_type: RecordType,
    pub record: Record,
}

/// Normalize a raw item into a record of the matching type
pub fn normalize(item: &RawItem) -> Result<Normalized> {
    match item.kind {
        ItemKind::Activity => activity::normalize_activity(&item.payload),
        ItemKind::DailyHealth => Ok(Normalized {
            record_type: RecordType::DailyHealth,
            record: health::daily_health(&item.payload)?,
        }),
        ItemKind::Physiological => Ok(Normalized {
            record_type: RecordType::Physiological,
            record: health::physiological(&item.payload)?,
        }),
        ItemKind::BodyMeasurement => Ok(Normalized {
            record_type: RecordType::BodyComposition,
            record: body::body_measurement(&item.payload)?,
        }),
        ItemKind::CodingDay => Ok(Normalized {
            record_type: RecordType::CodingActivity,
            record: coding::coding_day(&item.payload)?,
        }),
    }
}

/// Follow a path of object keys
pub(crate) fn at<'a>(value: &'a serde_json::Value, path: &[&str]) -> Option<&'a serde_json::Value> {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .filter(|v| !v.is_null())
}

/// Numeric value, accepting numbers encoded as strings
pub(crate) fn value_to_f64(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

pub(crate) fn num(value: &serde_json::Value, path: &[&str]) -> Option<f64> {
    at(value, path).and_then(value_to_f64)
}

pub(crate) fn text<'a>(value: &'a serde_json::Value, path: &[&str]) -> Option<&'a str> {
    at(value, path).and_then(|v| v.as_str())
}

/// First element of an array, or the value itself
pub(crate) fn first_entry(value: &serde_json::Value) -> Option<&serde_json::Value> {
    if let Some(array) = value.as_array() {
        array.first()
    } else {
        Some(value)
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
