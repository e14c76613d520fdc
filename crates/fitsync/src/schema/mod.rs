//! Schema registry
//!
//! Static mapping from a [`RecordType`] to its [`SchemaDescriptor`]: ordered
//! columns with declared types and missing-value policies, the composite key,
//! the ordering column and the partition location under the data directory.

pub mod activity;
pub mod column;
pub mod record;
pub mod tables;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

pub use activity::{route, ActivityCategory, ActivityVariant, CATEGORY_TABLE};
pub use column::{ColumnDef, ColumnType, MissingPolicy};
pub use record::{Record, Value, DATE_FORMAT, TIMESTAMP_FORMAT};

use crate::error::{Result, SyncError};

/// Identifies one storage partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordType {
    Activity(ActivityCategory),
    DailyHealth,
    Physiological,
    BodyComposition,
    CodingActivity,
    WeeklyTrainingZones,
    RecoveryTrends,
}

impl RecordType {
    /// Every record type, in a stable order
    pub fn all() -> Vec<RecordType> {
        let mut all: Vec<RecordType> = ActivityCategory::ALL
            .iter()
            .map(|c| RecordType::Activity(*c))
            .collect();
        all.extend([
            RecordType::DailyHealth,
            RecordType::Physiological,
            RecordType::BodyComposition,
            RecordType::CodingActivity,
            RecordType::WeeklyTrainingZones,
            RecordType::RecoveryTrends,
        ]);
        all
    }

    /// Stable identifier, e.g. `running_activities` or `daily_health`
    pub fn id(&self) -> String {
        match self {
            RecordType::Activity(category) => format!("{}_activities", category.as_str()),
            RecordType::DailyHealth => "daily_health".to_string(),
            RecordType::Physiological => "physiological".to_string(),
            RecordType::BodyComposition => "body_composition".to_string(),
            RecordType::CodingActivity => "coding_activity".to_string(),
            RecordType::WeeklyTrainingZones => "weekly_training_zones".to_string(),
            RecordType::RecoveryTrends => "recovery_trends".to_string(),
        }
    }

    pub fn from_id(id: &str) -> Option<RecordType> {
        let id = id.trim().to_ascii_lowercase();
        if let Some(tag) = id.strip_suffix("_activities") {
            return ActivityCategory::from_tag(tag).map(RecordType::Activity);
        }
        RecordType::all().into_iter().find(|t| t.id() == id)
    }

    /// Schema descriptor for this record type
    pub fn schema(&self) -> &'static SchemaDescriptor {
        &REGISTRY[self]
    }

    pub fn is_activity(&self) -> bool {
        matches!(self, RecordType::Activity(_))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// Immutable description of one partition's layout
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    pub record_type: RecordType,
    pub dir: &'static str,
    pub file: &'static str,
    pub columns: Vec<ColumnDef>,
    /// Composite key, ordered and non-empty
    pub key: &'static [&'static str],
    /// Primary time column used to order the partition
    pub order_by: &'static str,
}

impl SchemaDescriptor {
    /// Path of the partition file relative to the data directory
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.dir).join(self.file)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn header(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Columns of `record` that this schema does not declare
    pub fn unknown_columns<'a>(&self, record: &'a Record) -> Vec<&'a str> {
        record
            .columns()
            .filter(|name| self.column(name).is_none())
            .collect()
    }

    /// Project a record onto this schema.
    ///
    /// Unknown columns are dropped, absent ones take their missing-value
    /// policy, and every value is coerced to its declared type. A failed
    /// coercion or an empty key field makes the record invalid.
    pub fn project(&self, record: &Record) -> Result<Record> {
        let mut projected = Record::new();
        for column in &self.columns {
            let value = column
                .coerce(record.value(column.name))
                .map_err(SyncError::record_invalid)?;
            projected.set(column.name, value);
        }
        self.key_of(&projected)?;
        Ok(projected)
    }

    /// Key tuple of an already projected record, rendered canonically
    pub fn key_of(&self, record: &Record) -> Result<Vec<String>> {
        self.key
            .iter()
            .map(|field| {
                let value = record.value(field);
                if value.is_missing() {
                    Err(SyncError::record_invalid(format!(
                        "missing key field {field}"
                    )))
                } else {
                    Ok(value.render())
                }
            })
            .collect()
    }
}

const DATE_KEY: &[&str] = &["date"];
const ACTIVITY_KEY: &[&str] = &["date", "activity_id"];
const WEEK_KEY: &[&str] = &["week_start_date"];

fn single(
    record_type: RecordType,
    dir: &'static str,
    file: &'static str,
    columns: &[ColumnDef],
    key: &'static [&'static str],
) -> SchemaDescriptor {
    SchemaDescriptor {
        record_type,
        dir,
        file,
        columns: columns.to_vec(),
        key,
        order_by: key[0],
    }
}

static REGISTRY: LazyLock<BTreeMap<RecordType, SchemaDescriptor>> = LazyLock::new(|| {
    let mut registry = BTreeMap::new();

    for variant in CATEGORY_TABLE {
        let record_type = RecordType::Activity(variant.category);
        let mut columns = activity::CORE_ACTIVITY_COLUMNS.to_vec();
        columns.extend_from_slice(variant.columns);
        registry.insert(
            record_type,
            SchemaDescriptor {
                record_type,
                dir: "activities",
                file: variant.file,
                columns,
                key: ACTIVITY_KEY,
                order_by: "date",
            },
        );
    }

    for descriptor in [
        single(
            RecordType::DailyHealth,
            "health",
            "daily_metrics.csv",
            tables::DAILY_HEALTH_COLUMNS,
            DATE_KEY,
        ),
        single(
            RecordType::Physiological,
            "physiological",
            "vo2_training_status.csv",
            tables::PHYSIOLOGICAL_COLUMNS,
            DATE_KEY,
        ),
        single(
            RecordType::BodyComposition,
            "body_composition",
            "daily_body_metrics.csv",
            tables::BODY_COMPOSITION_COLUMNS,
            DATE_KEY,
        ),
        single(
            RecordType::CodingActivity,
            "lifestyle",
            "daily_coding_metrics.csv",
            tables::CODING_ACTIVITY_COLUMNS,
            DATE_KEY,
        ),
        single(
            RecordType::WeeklyTrainingZones,
            "training_zones",
            "weekly_training_zones.csv",
            tables::WEEKLY_TRAINING_ZONES_COLUMNS,
            WEEK_KEY,
        ),
        single(
            RecordType::RecoveryTrends,
            "recovery_trends",
            "recovery_trends.csv",
            tables::RECOVERY_TRENDS_COLUMNS,
            DATE_KEY,
        ),
    ] {
        registry.insert(descriptor.record_type, descriptor);
    }

    registry
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_record_type_is_registered() {
        for record_type in RecordType::all() {
            let schema = record_type.schema();
            assert_eq!(schema.record_type, record_type);
            assert!(!schema.key.is_empty());
        }
    }

    #[test]
    fn test_keys_and_order_columns_are_declared() {
        for record_type in RecordType::all() {
            let schema = record_type.schema();
            for field in schema.key {
                assert!(schema.column(field).is_some(), "{record_type}: key {field}");
            }
            assert!(schema.column(schema.order_by).is_some());
        }
    }

    #[test]
    fn test_column_names_are_unique() {
        for record_type in RecordType::all() {
            let header = record_type.schema().header();
            let unique: HashSet<_> = header.iter().collect();
            assert_eq!(unique.len(), header.len(), "duplicate column in {record_type}");
        }
    }

    #[test]
    fn test_partition_paths_are_distinct() {
        let paths: HashSet<_> = RecordType::all()
            .iter()
            .map(|t| t.schema().relative_path())
            .collect();
        assert_eq!(paths.len(), RecordType::all().len());
    }

    #[test]
    fn test_id_round_trip() {
        for record_type in RecordType::all() {
            assert_eq!(RecordType::from_id(&record_type.id()), Some(record_type));
        }
        assert_eq!(RecordType::from_id("nope"), None);
    }

    #[test]
    fn test_activity_schema_path() {
        let schema = RecordType::Activity(ActivityCategory::Running).schema();
        assert_eq!(
            schema.relative_path(),
            PathBuf::from("activities/running_activities.csv")
        );
        assert_eq!(schema.key, &["date", "activity_id"]);
    }

    #[test]
    fn test_project_fills_and_drops() {
        let schema = RecordType::Activity(ActivityCategory::Other).schema();
        let record = Record::new()
            .with("date", "2024-01-01")
            .with("activity_id", "a1")
            .with("not_a_column", 5i64);

        assert_eq!(schema.unknown_columns(&record), vec!["not_a_column"]);
        let projected = schema.project(&record).unwrap();
        assert_eq!(projected.len(), schema.columns.len());
        assert!(!projected.contains("not_a_column"));
        assert_eq!(projected.value("calories"), &Value::Float(0.0));
        assert_eq!(projected.value("activity_type").as_str(), Some("unknown"));
        assert!(projected.value("avg_hr").is_missing());
    }

    #[test]
    fn test_project_rejects_missing_key() {
        let schema = RecordType::DailyHealth.schema();
        let err = schema.project(&Record::new().with("steps", 100i64)).unwrap_err();
        assert!(err.to_string().contains("missing key field date"));
    }

    #[test]
    fn test_project_rejects_bad_coercion() {
        let schema = RecordType::DailyHealth.schema();
        let record = Record::new()
            .with("date", "2024-01-01")
            .with("steps", "lots");
        assert!(matches!(
            schema.project(&record),
            Err(SyncError::RecordInvalid(_))
        ));
    }
}
