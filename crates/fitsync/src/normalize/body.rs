//! Smart-scale measurements
//!
//! Scale apps export one row per weigh-in with human-readable headers such
//! as `Weight(kg)` or `Body Fat`. Headers are matched after stripping units,
//! case and punctuation; values may carry a unit suffix.

use chrono::NaiveDateTime;

use crate::error::{Result, SyncError};
use crate::schema::column::parse_timestamp;
use crate::schema::Record;

/// Normalized export header → schema column
const HEADER_MAP: &[(&str, &str)] = &[
    ("weight", "weight_kg"),
    ("bmi", "bmi"),
    ("bodyfat", "body_fat_percent"),
    ("musclemass", "muscle_mass_kg"),
    ("bonemass", "bone_mass_kg"),
    ("bodywater", "body_water_percent"),
    ("water", "body_water_percent"),
    ("visceralfat", "visceral_fat_level"),
    ("metabolicage", "metabolic_age"),
    ("bodyage", "metabolic_age"),
    ("protein", "protein_percent"),
    ("subcutaneousfat", "subcutaneous_fat_percent"),
    ("skeletalmusclemass", "skeletal_muscle_mass_kg"),
    ("skeletalmuscle", "skeletal_muscle_mass_kg"),
    ("bmr", "basal_metabolic_rate"),
    ("basalmetabolicrate", "basal_metabolic_rate"),
];

const TEXT_HEADERS: &[(&str, &str)] = &[
    ("bodytype", "body_type_score"),
    ("model", "scale_model"),
    ("device", "scale_model"),
    ("user", "user_profile"),
    ("member", "user_profile"),
];

const TIMESTAMP_HEADERS: &[&str] = &["timestamp", "time", "date", "datetime", "measuredat"];

/// Columns counted towards the measurement-quality grade
const QUALITY_COLUMNS: &[&str] = &[
    "weight_kg",
    "body_fat_percent",
    "muscle_mass_kg",
    "bone_mass_kg",
    "body_water_percent",
    "visceral_fat_level",
    "protein_percent",
    "subcutaneous_fat_percent",
    "basal_metabolic_rate",
    "metabolic_age",
    "skeletal_muscle_mass_kg",
    "bmi",
];

pub const DEFAULT_SOURCE: &str = "smart_scale_export";

fn normalize_header(header: &str) -> String {
    header
        .split('(')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Number with an optional unit suffix, e.g. `18.5%` or `72.4 kg`
fn parse_measure(raw: &str) -> Option<f64> {
    let numeric: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    numeric.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_export_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    parse_timestamp(raw).or_else(|| {
        ["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M", "%d.%m.%Y %H:%M", "%Y/%m/%d %H:%M:%S"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    })
}

/// Measurement time of an export row, from the first parseable time header
pub(crate) fn row_timestamp(
    row: &serde_json::Map<String, serde_json::Value>,
) -> Option<NaiveDateTime> {
    row.iter()
        .filter(|(header, _)| TIMESTAMP_HEADERS.contains(&normalize_header(header).as_str()))
        .find_map(|(_, cell)| cell.as_str().and_then(parse_export_timestamp))
}

/// Completeness grade over the twelve composition metrics
pub fn measurement_quality(record: &Record) -> &'static str {
    let present = QUALITY_COLUMNS
        .iter()
        .filter(|c| !record.value(c).is_missing())
        .count();
    let percentage = present as f64 / QUALITY_COLUMNS.len() as f64 * 100.0;
    if percentage >= 90.0 {
        "excellent"
    } else if percentage >= 75.0 {
        "good"
    } else if percentage >= 50.0 {
        "fair"
    } else {
        "poor"
    }
}

/// Normalize one export row (header → cell text)
pub fn body_measurement(payload: &serde_json::Value) -> Result<Record> {
    let row = payload
        .as_object()
        .ok_or_else(|| SyncError::record_invalid("body measurement row is not an object"))?;

    let measured_at = row_timestamp(row)
        .ok_or_else(|| SyncError::record_invalid("body measurement without a timestamp"))?;
    let mut record = Record::new();

    for (header, cell) in row {
        let cell = match cell {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => continue,
            other => other.to_string(),
        };
        if cell.trim().is_empty() {
            continue;
        }
        let key = normalize_header(header);

        if let Some((_, column)) = HEADER_MAP.iter().find(|(h, _)| *h == key) {
            record.set_present(*column, parse_measure(&cell));
        } else if let Some((_, column)) = TEXT_HEADERS.iter().find(|(h, _)| *h == key) {
            record.set(*column, cell.trim());
        }
    }

    record
        .set("date", measured_at.date())
        .set("time", measured_at.format("%H:%M:%S").to_string())
        .set("timestamp", measured_at);

    let quality = measurement_quality(&record);
    record
        .set("measurement_quality", quality)
        .set("measurement_source", DEFAULT_SOURCE);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Value;
    use serde_json::json;

    #[test]
    fn test_header_normalization() {
        assert_eq!(normalize_header("Weight(kg)"), "weight");
        assert_eq!(normalize_header("Body Fat"), "bodyfat");
        assert_eq!(normalize_header("Skeletal Muscle Mass (kg)"), "skeletalmusclemass");
    }

    #[test]
    fn test_parse_measure_strips_units() {
        assert_eq!(parse_measure("18.5%"), Some(18.5));
        assert_eq!(parse_measure(" 72.4 kg"), Some(72.4));
        assert_eq!(parse_measure("--"), None);
    }

    #[test]
    fn test_body_measurement_maps_export_row() {
        let row = json!({
            "Timestamp": "2024-02-10 07:31:00",
            "Weight(kg)": "72.4",
            "BMI": "22.1",
            "Body Fat(%)": "18.5%",
            "Muscle Mass(kg)": "56.1",
            "Unrelated": "x"
        });
        let record = body_measurement(&row).unwrap();
        assert_eq!(record.value("date").render(), "2024-02-10");
        assert_eq!(record.value("time").as_str(), Some("07:31:00"));
        assert_eq!(record.value("weight_kg"), &Value::Float(72.4));
        assert_eq!(record.value("body_fat_percent"), &Value::Float(18.5));
        assert_eq!(record.value("measurement_quality").as_str(), Some("poor"));
        assert!(!record.contains("Unrelated"));
    }

    #[test]
    fn test_body_measurement_without_timestamp_is_invalid() {
        let row = json!({"Weight": "72.4"});
        assert!(matches!(
            body_measurement(&row),
            Err(SyncError::RecordInvalid(_))
        ));
    }

    #[test]
    fn test_quality_grades() {
        let mut record = Record::new();
        for column in &QUALITY_COLUMNS[..11] {
            record.set(*column, 1.0);
        }
        assert_eq!(measurement_quality(&record), "excellent");
        let mut record = Record::new();
        for column in &QUALITY_COLUMNS[..9] {
            record.set(*column, 1.0);
        }
        assert_eq!(measurement_quality(&record), "good");
        let mut record = Record::new();
        for column in &QUALITY_COLUMNS[..6] {
            record.set(*column, 1.0);
        }
        assert_eq!(measurement_quality(&record), "fair");
    }

    #[test]
    fn test_us_style_timestamp() {
        assert!(parse_export_timestamp("02/10/2024 07:31").is_some());
    }
}
