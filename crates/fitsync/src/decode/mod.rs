//! Developer-field decoding
//!
//! Connect IQ apps attach numbered developer fields to an activity. Each
//! activity category carries a [`DecodeTable`] mapping field numbers to named
//! columns. Decoding is a pure function of the table and the blob.

pub mod tables;

use serde::Serialize;
use tracing::debug;

use crate::schema::{ActivityCategory, Record, RecordType, Value};

/// Conversion applied to a raw developer-field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Decimal text truncated toward zero, so `"6.0"` decodes to `6`
    Integer,
    Float,
    /// Verbatim, trimmed
    Text,
}

impl Transform {
    pub fn apply(&self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        match self {
            Transform::Integer => raw
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    raw.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .map(Value::Integer),
            Transform::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float),
            Transform::Text if raw.is_empty() => None,
            Transform::Text => Some(Value::Text(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub field: u32,
    pub column: &'static str,
    pub transform: Transform,
}

impl FieldMapping {
    pub const fn new(field: u32, column: &'static str, transform: Transform) -> Self {
        Self {
            field,
            column,
            transform,
        }
    }
}

/// Contiguous field numbers that each hold one `"breaths / hold / hold_stage2"`
/// round summary. Round numbers count from 1 at `first`.
#[derive(Debug, Clone, Copy)]
pub struct RoundRange {
    pub first: u32,
    pub last: u32,
    pub column: &'static str,
}

impl RoundRange {
    fn contains(&self, field: u32) -> bool {
        (self.first..=self.last).contains(&field)
    }
}

/// Per-category decode table
#[derive(Debug)]
pub struct DecodeTable {
    pub fields: &'static [FieldMapping],
    pub rounds: Option<RoundRange>,
}

impl DecodeTable {
    pub const EMPTY: DecodeTable = DecodeTable {
        fields: &[],
        rounds: None,
    };

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.rounds.is_none()
    }

    /// Every column this table can produce
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .map(|f| f.column)
            .chain(self.rounds.iter().map(|r| r.column))
    }
}

/// Ordered `(field_number, raw_value)` pairs from one activity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeveloperFieldBlob {
    pub fields: Vec<(u32, String)>,
}

impl DeveloperFieldBlob {
    pub fn new(fields: Vec<(u32, String)>) -> Self {
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Read `connectIQMeasurements` from an activity payload.
    ///
    /// Entries without a usable field number are skipped; numeric values are
    /// rendered to text so every transform sees the same input shape.
    pub fn from_connect_iq(payload: &serde_json::Value) -> Self {
        let fields = payload
            .get("connectIQMeasurements")
            .and_then(|m| m.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let field = entry.get("developerFieldNumber")?.as_u64()?;
                        let field = u32::try_from(field).ok()?;
                        let raw = match entry.get("value")? {
                            serde_json::Value::String(s) => s.clone(),
                            serde_json::Value::Null => return None,
                            other => other.to_string(),
                        };
                        Some((field, raw))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { fields }
    }
}

impl<S: Into<String>> FromIterator<(u32, S)> for DeveloperFieldBlob {
    fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(f, v)| (f, v.into())).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundDetail {
    pub round_number: u32,
    pub breaths: i64,
    pub hold_time: String,
    pub hold_time_stage2: String,
}

fn parse_round(round_number: u32, raw: &str) -> Option<RoundDetail> {
    let parts: Vec<&str> = raw.split('/').map(str::trim).collect();
    match parts.as_slice() {
        [breaths, hold, hold_stage2] => Some(RoundDetail {
            round_number,
            breaths: Transform::Integer.apply(breaths)?.as_i64()?,
            hold_time: (*hold).to_string(),
            hold_time_stage2: (*hold_stage2).to_string(),
        }),
        _ => None,
    }
}

/// Decode a blob for an activity category
pub fn decode(category: ActivityCategory, blob: &DeveloperFieldBlob) -> Record {
    let mut record = decode_with(category.variant().decode, blob);
    let schema = RecordType::Activity(category).schema();
    let absent: Vec<String> = record
        .iter()
        .filter(|(_, value)| value.is_missing())
        .map(|(column, _)| column.to_string())
        .collect();
    for column in absent {
        if let Some(def) = schema.column(&column) {
            record.set(column, def.fill());
        }
    }
    record
}

/// Decode a blob against an explicit table.
///
/// Every column of the table is present in the output; columns whose field
/// is absent or fails its transform are [`Value::Missing`], left for the
/// schema's missing-value policy. Unmapped field numbers are ignored.
pub fn decode_with(table: &DecodeTable, blob: &DeveloperFieldBlob) -> Record {
    let mut record: Record = table.columns().map(|c| (c, Value::Missing)).collect();
    let mut rounds = Vec::new();

    for (field, raw) in &blob.fields {
        if let Some(mapping) = table.fields.iter().find(|m| m.field == *field) {
            match mapping.transform.apply(raw) {
                Some(value) => {
                    record.set(mapping.column, value);
                }
                None => debug!(
                    field = *field,
                    column = mapping.column,
                    raw = raw.as_str(),
                    "developer field failed transform"
                ),
            }
            continue;
        }
        if let Some(range) = table.rounds.filter(|r| r.contains(*field)) {
            match parse_round(field - range.first + 1, raw) {
                Some(round) => rounds.push(round),
                None => debug!(field = *field, raw = raw.as_str(), "unparseable round summary"),
            }
        }
    }

    if let Some(range) = table.rounds {
        if !rounds.is_empty() {
            rounds.sort_by_key(|r| r.round_number);
            if let Ok(json) = serde_json::to_string(&rounds) {
                record.set(range.column, json);
            }
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static ROUNDS_AND_BREATHS: DecodeTable = DecodeTable {
        fields: &[
            FieldMapping::new(0, "rounds", Transform::Integer),
            FieldMapping::new(1, "breaths", Transform::Integer),
        ],
        rounds: None,
    };

    #[test]
    fn test_decode_mapped_fields() {
        let blob: DeveloperFieldBlob = [(0, "3"), (1, "42")].into_iter().collect();
        let record = decode_with(&ROUNDS_AND_BREATHS, &blob);
        assert_eq!(record.value("rounds"), &Value::Integer(3));
        assert_eq!(record.value("breaths"), &Value::Integer(42));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_decode_ignores_unmapped_and_leaves_absent_missing() {
        let blob: DeveloperFieldBlob = [(0, "3"), (9, "99")].into_iter().collect();
        let record = decode_with(&ROUNDS_AND_BREATHS, &blob);
        assert_eq!(record.value("rounds"), &Value::Integer(3));
        assert!(record.contains("breaths"));
        assert!(record.value("breaths").is_missing());
        assert!(!record.contains("9"));
    }

    #[test]
    fn test_absent_field_takes_column_policy() {
        let blob: DeveloperFieldBlob = [(0, "3"), (9, "99")].into_iter().collect();
        let record = decode(ActivityCategory::Breathwork, &blob);
        let schema = RecordType::Activity(ActivityCategory::Breathwork).schema();
        assert_eq!(record.value("whm_rounds_total"), &Value::Integer(3));
        assert_eq!(
            record.value("whm_total_breaths"),
            &schema.column("whm_total_breaths").unwrap().fill()
        );
        assert!(!record.contains("9"));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let blob: DeveloperFieldBlob = [(0, "6.0"), (1, "337.0"), (11, "30 / 1:03 / 15")]
            .into_iter()
            .collect();
        let first = decode(ActivityCategory::Breathwork, &blob);
        let second = decode(ActivityCategory::Breathwork, &blob);
        assert_eq!(first, second);
    }

    #[test]
    fn test_integer_transform_truncates() {
        assert_eq!(Transform::Integer.apply("6.0"), Some(Value::Integer(6)));
        assert_eq!(Transform::Integer.apply("6.9"), Some(Value::Integer(6)));
        assert_eq!(Transform::Integer.apply("-2.5"), Some(Value::Integer(-2)));
        assert_eq!(Transform::Integer.apply("1:03"), None);
        assert_eq!(Transform::Text.apply("  1:03 "), Some(Value::Text("1:03".into())));
    }

    #[test]
    fn test_breathwork_rounds_collected() {
        let blob: DeveloperFieldBlob = [
            (0, "2.0"),
            (1, "60.0"),
            (2, "1:30"),
            (12, "30 / 1:30 / 15"),
            (11, "30 / 1:03 / 15"),
            (13, "garbage"),
        ]
        .into_iter()
        .collect();
        let record = decode(ActivityCategory::Breathwork, &blob);
        assert_eq!(record.value("whm_rounds_total"), &Value::Integer(2));
        assert_eq!(record.value("whm_total_breaths"), &Value::Integer(60));
        assert_eq!(record.value("whm_max_breath_hold").as_str(), Some("1:30"));
        assert!(record.value("whm_max_breath_hold_stage2").is_missing());

        let details: serde_json::Value =
            serde_json::from_str(record.value("whm_round_details").as_str().unwrap()).unwrap();
        assert_eq!(
            details,
            json!([
                {"round_number": 1, "breaths": 30, "hold_time": "1:03", "hold_time_stage2": "15"},
                {"round_number": 2, "breaths": 30, "hold_time": "1:30", "hold_time_stage2": "15"}
            ])
        );
    }

    #[test]
    fn test_surfing_table() {
        let blob: DeveloperFieldBlob = [(0, "14"), (1, "22.5"), (2, "31.2"), (3, "2400")]
            .into_iter()
            .collect();
        let record = decode(ActivityCategory::Surfing, &blob);
        assert_eq!(record.value("total_waves"), &Value::Integer(14));
        assert_eq!(record.value("longest_wave_seconds"), &Value::Float(22.5));
        assert_eq!(record.value("max_speed_kmh"), &Value::Float(31.2));
        assert_eq!(record.value("total_surf_time_seconds"), &Value::Float(2400.0));
    }

    #[test]
    fn test_categories_without_table_decode_to_nothing() {
        let blob: DeveloperFieldBlob = [(0, "14")].into_iter().collect();
        assert!(decode(ActivityCategory::Running, &blob).is_empty());
    }

    #[test]
    fn test_from_connect_iq_payload() {
        let payload = json!({
            "connectIQMeasurements": [
                {"developerFieldNumber": 0, "value": "6.0", "appID": "x"},
                {"developerFieldNumber": 1, "value": 337.0},
                {"developerFieldNumber": 2, "value": null},
                {"value": "orphan"}
            ]
        });
        let blob = DeveloperFieldBlob::from_connect_iq(&payload);
        assert_eq!(
            blob.fields,
            vec![(0, "6.0".to_string()), (1, "337.0".to_string())]
        );
        assert!(DeveloperFieldBlob::from_connect_iq(&json!({})).is_empty());
    }
}
