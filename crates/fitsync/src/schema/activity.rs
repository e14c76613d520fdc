//! Activity categories and their routing table
//!
//! Every provider activity lands in exactly one category partition. The
//! category table below is the only place that knows about categories: it
//! carries the match patterns, the extra columns, the developer-field decode
//! table and the extractor for each one. Unmatched activities fall through to
//! [`ActivityCategory::Other`], which stores the core columns only.

use std::fmt;

use super::column::{ColumnDef, MissingPolicy};
use super::record::Record;
use crate::decode::{tables as decode_tables, DecodeTable};
use crate::normalize::activity as extract;

/// Category-specific field extraction from the provider payload
pub type Extractor = fn(&serde_json::Value, &mut Record);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActivityCategory {
    Surfing,
    Swimming,
    Running,
    Strength,
    Breathwork,
    Recovery,
    /// Fallback for anything without a specialized schema
    Other,
}

impl ActivityCategory {
    pub const ALL: [ActivityCategory; 7] = [
        ActivityCategory::Surfing,
        ActivityCategory::Swimming,
        ActivityCategory::Running,
        ActivityCategory::Strength,
        ActivityCategory::Breathwork,
        ActivityCategory::Recovery,
        ActivityCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        self.variant().tag
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        CATEGORY_TABLE
            .iter()
            .find(|v| v.tag.eq_ignore_ascii_case(tag))
            .map(|v| v.category)
    }

    /// Routing descriptor for this category
    pub fn variant(&self) -> &'static ActivityVariant {
        CATEGORY_TABLE
            .iter()
            .find(|v| v.category == *self)
            .unwrap_or(&OTHER)
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the routing table
pub struct ActivityVariant {
    pub category: ActivityCategory,
    pub tag: &'static str,
    /// Substrings matched against the provider type key
    pub type_keys: &'static [&'static str],
    /// Substrings matched against the type key or the activity name
    pub name_keys: &'static [&'static str],
    pub file: &'static str,
    pub columns: &'static [ColumnDef],
    pub decode: &'static DecodeTable,
    pub extract: Extractor,
}

impl ActivityVariant {
    fn matches(&self, type_key: &str, name: &str) -> bool {
        self.type_keys.iter().any(|k| type_key.contains(k))
            || self
                .name_keys
                .iter()
                .any(|k| type_key.contains(k) || name.contains(k))
    }
}

/// Normalize a provider category to one of the known categories.
///
/// Never fails: anything unrecognized routes to [`ActivityCategory::Other`].
pub fn route(type_key: &str, activity_name: &str) -> ActivityCategory {
    let type_key = type_key.to_ascii_lowercase();
    let name = activity_name.to_ascii_lowercase();
    CATEGORY_TABLE
        .iter()
        .find(|v| v.matches(&type_key, &name))
        .map(|v| v.category)
        .unwrap_or(ActivityCategory::Other)
}

pub const CORE_ACTIVITY_COLUMNS: &[ColumnDef] = &[
    ColumnDef::date("date"),
    ColumnDef::text("activity_id"),
    ColumnDef::text("activity_name"),
    ColumnDef::text("activity_type").or(MissingPolicy::Literal("unknown")),
    ColumnDef::float("duration_seconds").or_zero(),
    ColumnDef::float("calories").or_zero(),
    ColumnDef::float("avg_hr"),
    ColumnDef::float("max_hr"),
    ColumnDef::float("hr_zone_1_time").or_zero(),
    ColumnDef::float("hr_zone_2_time").or_zero(),
    ColumnDef::float("hr_zone_3_time").or_zero(),
    ColumnDef::float("hr_zone_4_time").or_zero(),
    ColumnDef::float("hr_zone_5_time").or_zero(),
    ColumnDef::float("training_effect_aerobic"),
    ColumnDef::float("training_effect_anaerobic"),
    ColumnDef::float("recovery_time_hrs").or_zero(),
    ColumnDef::float("stress_start"),
    ColumnDef::float("stress_end"),
    ColumnDef::float("stress_change"),
    ColumnDef::float("body_battery_impact"),
];

const SURFING_COLUMNS: &[ColumnDef] = &[
    ColumnDef::float("distance_meters").or_zero(),
    ColumnDef::float("max_speed_kmh"),
    ColumnDef::float("avg_speed_kmh"),
    ColumnDef::int("total_waves"),
    ColumnDef::float("longest_wave_seconds"),
    ColumnDef::float("total_surf_time_seconds"),
    ColumnDef::float("paddle_time_seconds"),
    ColumnDef::float("surf_vs_paddle_ratio"),
    ColumnDef::float("avg_wave_speed"),
    ColumnDef::float("avg_wave_distance"),
    ColumnDef::float("wave_frequency_per_hour"),
    ColumnDef::float("session_rating"),
];

const SWIMMING_COLUMNS: &[ColumnDef] = &[
    ColumnDef::float("distance_meters").or_zero(),
    ColumnDef::float("pool_size_meters"),
    ColumnDef::int("total_strokes"),
    ColumnDef::float("avg_swolf"),
    ColumnDef::float("avg_stroke_rate_spm"),
    ColumnDef::float("avg_distance_per_stroke"),
    ColumnDef::text("stroke_type_primary"),
    ColumnDef::int("total_lengths"),
    ColumnDef::int("total_intervals"),
    ColumnDef::float("rest_time_seconds").or_zero(),
    ColumnDef::float("drill_time_seconds").or_zero(),
    ColumnDef::float("avg_pace_per_100m"),
    ColumnDef::float("css_pace_per_100m"),
    ColumnDef::float("stroke_efficiency_score"),
    ColumnDef::flag("is_open_water"),
];

const RUNNING_COLUMNS: &[ColumnDef] = &[
    ColumnDef::float("distance_meters").or_zero(),
    ColumnDef::float("avg_pace_per_km"),
    ColumnDef::float("avg_cadence_spm"),
    ColumnDef::float("avg_stride_length"),
    ColumnDef::float("vertical_oscillation_cm"),
    ColumnDef::float("ground_contact_time_ms"),
    ColumnDef::float("running_power_watts"),
    ColumnDef::float("elevation_gain_meters"),
    ColumnDef::float("elevation_loss_meters"),
    ColumnDef::float("avg_temperature"),
    ColumnDef::float("lactate_threshold_hr"),
    ColumnDef::float("running_dynamics_score"),
    ColumnDef::flag("is_treadmill"),
];

const STRENGTH_COLUMNS: &[ColumnDef] = &[
    ColumnDef::int("total_sets"),
    ColumnDef::int("total_reps"),
    ColumnDef::float("total_volume_kg").or_zero(),
    ColumnDef::float("avg_rest_seconds"),
    ColumnDef::float("max_weight_kg"),
    ColumnDef::text("primary_muscle_groups"),
    ColumnDef::int("exercise_count").or_zero(),
    ColumnDef::text("workout_type"),
    ColumnDef::float("compound_vs_isolation_ratio"),
    ColumnDef::text("training_focus"),
];

const BREATHWORK_COLUMNS: &[ColumnDef] = &[
    ColumnDef::int("whm_rounds_total"),
    ColumnDef::int("whm_total_breaths"),
    ColumnDef::text("whm_max_breath_hold"),
    ColumnDef::text("whm_max_breath_hold_stage2"),
    ColumnDef::text("whm_round_details"),
    ColumnDef::float("avg_respiration_rate"),
    ColumnDef::float("min_respiration_rate"),
    ColumnDef::float("max_respiration_rate"),
    ColumnDef::text("technique_type").or(MissingPolicy::Literal("General Breathwork")),
    ColumnDef::float("breath_hold_improvement"),
    ColumnDef::text("session_intensity"),
];

const RECOVERY_COLUMNS: &[ColumnDef] = &[
    ColumnDef::text("session_type"),
    ColumnDef::float("temperature_celsius"),
    ColumnDef::float("humidity_percent"),
    ColumnDef::int("rounds_completed"),
    ColumnDef::float("total_heat_time_seconds"),
    ColumnDef::float("total_cool_time_seconds"),
    ColumnDef::float("avg_temperature"),
    ColumnDef::float("recovery_rating"),
    ColumnDef::text("hydration_level"),
    ColumnDef::text("location"),
];

const OTHER: ActivityVariant = ActivityVariant {
    category: ActivityCategory::Other,
    tag: "other",
    type_keys: &[],
    name_keys: &[],
    file: "other_activities.csv",
    columns: &[],
    decode: &DecodeTable::EMPTY,
    extract: extract::no_extras,
};

/// Routing table, in match priority order
pub static CATEGORY_TABLE: &[ActivityVariant] = &[
    ActivityVariant {
        category: ActivityCategory::Surfing,
        tag: "surfing",
        type_keys: &["surfing", "sup"],
        name_keys: &[],
        file: "surfing_activities.csv",
        columns: SURFING_COLUMNS,
        decode: &decode_tables::SURF_TRACKER,
        extract: extract::surfing,
    },
    ActivityVariant {
        category: ActivityCategory::Swimming,
        tag: "swimming",
        type_keys: &["swimming", "pool_swim", "open_water"],
        name_keys: &[],
        file: "swimming_activities.csv",
        columns: SWIMMING_COLUMNS,
        decode: &DecodeTable::EMPTY,
        extract: extract::swimming,
    },
    ActivityVariant {
        category: ActivityCategory::Running,
        tag: "running",
        type_keys: &["running", "treadmill"],
        name_keys: &[],
        file: "running_activities.csv",
        columns: RUNNING_COLUMNS,
        decode: &DecodeTable::EMPTY,
        extract: extract::running,
    },
    ActivityVariant {
        category: ActivityCategory::Strength,
        tag: "strength",
        type_keys: &["strength", "weight", "bodyweight"],
        name_keys: &[],
        file: "strength_activities.csv",
        columns: STRENGTH_COLUMNS,
        decode: &DecodeTable::EMPTY,
        extract: extract::strength,
    },
    ActivityVariant {
        category: ActivityCategory::Breathwork,
        tag: "breathwork",
        type_keys: &[],
        name_keys: &["breathwork", "breathing", "meditation", "whm", "yoga", "wellness"],
        file: "breathwork_activities.csv",
        columns: BREATHWORK_COLUMNS,
        decode: &decode_tables::WIM_HOF,
        extract: extract::breathwork,
    },
    ActivityVariant {
        category: ActivityCategory::Recovery,
        tag: "recovery",
        type_keys: &[],
        name_keys: &["sauna", "steam", "ice_bath", "recovery"],
        file: "recovery_activities.csv",
        columns: RECOVERY_COLUMNS,
        decode: &DecodeTable::EMPTY,
        extract: extract::recovery,
    },
    OTHER,
];
