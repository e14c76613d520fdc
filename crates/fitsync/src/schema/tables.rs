//! Column lists for the non-activity record types

use super::column::{ColumnDef, MissingPolicy};

pub const DAILY_HEALTH_COLUMNS: &[ColumnDef] = &[
    ColumnDef::date("date"),
    ColumnDef::int("body_battery_start"),
    ColumnDef::int("body_battery_end"),
    ColumnDef::int("body_battery_charged"),
    ColumnDef::int("body_battery_drained"),
    ColumnDef::int("sleep_score"),
    ColumnDef::float("deep_sleep_minutes"),
    ColumnDef::float("rem_sleep_minutes"),
    ColumnDef::float("light_sleep_minutes"),
    ColumnDef::float("awake_minutes"),
    ColumnDef::float("sleep_efficiency"),
    ColumnDef::timestamp("sleep_start_time"),
    ColumnDef::timestamp("sleep_end_time"),
    ColumnDef::float("hrv_during_sleep"),
    ColumnDef::text("hrv_status"),
    ColumnDef::float("hrv_overnight_avg"),
    ColumnDef::float("hrv_weekly_avg"),
    ColumnDef::text("hrv_7_day_trend"),
    ColumnDef::float("stress_avg"),
    ColumnDef::float("stress_max"),
    ColumnDef::int("steps"),
    ColumnDef::float("floors_climbed"),
    ColumnDef::float("active_calories"),
    ColumnDef::float("avg_respiration_rate"),
    ColumnDef::float("spo2_avg"),
    ColumnDef::float("resting_heart_rate"),
    ColumnDef::float("sleep_need_baseline"),
    ColumnDef::float("sleep_need_actual"),
    ColumnDef::text("sleep_feedback"),
    ColumnDef::text("breathing_disruption_severity"),
    ColumnDef::float("detailed_avg_sleep_respiration"),
    ColumnDef::float("detailed_avg_waking_respiration"),
    ColumnDef::float("detailed_highest_respiration"),
    ColumnDef::float("detailed_lowest_respiration"),
    ColumnDef::float("respiration_range"),
];

pub const PHYSIOLOGICAL_COLUMNS: &[ColumnDef] = &[
    ColumnDef::date("date"),
    ColumnDef::float("vo2_max_running"),
    ColumnDef::float("vo2_max_cycling"),
    ColumnDef::float("fitness_age"),
    ColumnDef::text("training_status"),
    ColumnDef::float("training_load_7day"),
    ColumnDef::text("training_load_focus"),
    ColumnDef::text("recovery_advisor"),
    ColumnDef::float("performance_condition"),
    ColumnDef::float("training_load_aerobic_low"),
    ColumnDef::float("training_load_aerobic_high"),
    ColumnDef::float("training_load_anaerobic"),
    ColumnDef::float("training_load_aerobic_low_target_min"),
    ColumnDef::float("training_load_aerobic_low_target_max"),
    ColumnDef::float("training_load_aerobic_high_target_min"),
    ColumnDef::float("training_load_aerobic_high_target_max"),
    ColumnDef::float("training_load_anaerobic_target_min"),
    ColumnDef::float("training_load_anaerobic_target_max"),
    ColumnDef::text("training_balance_feedback"),
    ColumnDef::float("altitude_acclimatization"),
    ColumnDef::float("heat_acclimatization"),
];

pub const BODY_COMPOSITION_COLUMNS: &[ColumnDef] = &[
    ColumnDef::date("date"),
    ColumnDef::text("time"),
    ColumnDef::timestamp("timestamp"),
    ColumnDef::float("weight_kg"),
    ColumnDef::float("bmi"),
    ColumnDef::float("body_fat_percent"),
    ColumnDef::float("muscle_mass_kg"),
    ColumnDef::float("bone_mass_kg"),
    ColumnDef::float("body_water_percent"),
    ColumnDef::float("visceral_fat_level"),
    ColumnDef::float("metabolic_age"),
    ColumnDef::float("protein_percent"),
    ColumnDef::float("subcutaneous_fat_percent"),
    ColumnDef::float("skeletal_muscle_mass_kg"),
    ColumnDef::float("basal_metabolic_rate"),
    ColumnDef::text("body_type_score"),
    ColumnDef::text("measurement_source").or(MissingPolicy::Literal("scale_export")),
    ColumnDef::text("scale_model"),
    ColumnDef::text("user_profile"),
    ColumnDef::text("measurement_quality"),
];

pub const CODING_ACTIVITY_COLUMNS: &[ColumnDef] = &[
    ColumnDef::date("date"),
    ColumnDef::int("commits_count").or_zero(),
    ColumnDef::int("repos_active").or_zero(),
    ColumnDef::int("lines_added").or_zero(),
    ColumnDef::int("lines_deleted").or_zero(),
    ColumnDef::text("first_commit_time"),
    ColumnDef::text("last_commit_time"),
    ColumnDef::float("work_span_hours").or_zero(),
    ColumnDef::float("commit_frequency").or_zero(),
    ColumnDef::float("focus_score").or_zero(),
    ColumnDef::text("primary_language"),
    ColumnDef::text("primary_category"),
    ColumnDef::int("languages_count").or_zero(),
    ColumnDef::int("late_night_commits").or_zero(),
    ColumnDef::flag("is_weekend"),
    ColumnDef::text("repos_list"),
    ColumnDef::float("coding_intensity_score").or_zero(),
];

pub const WEEKLY_TRAINING_ZONES_COLUMNS: &[ColumnDef] = &[
    ColumnDef::date("week_start_date"),
    ColumnDef::date("week_end_date"),
    ColumnDef::float("total_training_time_minutes").or_zero(),
    ColumnDef::float("zone_1_time_minutes").or_zero(),
    ColumnDef::float("zone_1_percentage").or_zero(),
    ColumnDef::float("zone_2_time_minutes").or_zero(),
    ColumnDef::float("zone_2_percentage").or_zero(),
    ColumnDef::float("zone_3_time_minutes").or_zero(),
    ColumnDef::float("zone_3_percentage").or_zero(),
    ColumnDef::float("zone_4_time_minutes").or_zero(),
    ColumnDef::float("zone_4_percentage").or_zero(),
    ColumnDef::float("zone_5_time_minutes").or_zero(),
    ColumnDef::float("zone_5_percentage").or_zero(),
    ColumnDef::float("total_swimming_time").or_zero(),
    ColumnDef::float("total_strength_time").or_zero(),
    ColumnDef::float("total_aerobic_time").or_zero(),
    ColumnDef::float("weekly_training_load"),
    ColumnDef::float("weekly_training_stress"),
];

pub const RECOVERY_TRENDS_COLUMNS: &[ColumnDef] = &[
    ColumnDef::date("date"),
    ColumnDef::float("hrv_7_day_avg"),
    ColumnDef::float("hrv_14_day_avg"),
    ColumnDef::float("hrv_30_day_avg"),
    ColumnDef::text("hrv_trend_direction"),
    ColumnDef::float("sleep_efficiency_7_day_avg"),
    ColumnDef::float("sleep_efficiency_14_day_avg"),
    ColumnDef::float("sleep_score_7_day_avg"),
    ColumnDef::float("sleep_score_14_day_avg"),
    ColumnDef::float("rhr_7_day_avg"),
    ColumnDef::float("rhr_14_day_avg"),
    ColumnDef::text("rhr_trend_direction"),
    ColumnDef::float("body_battery_avg_7_day"),
    ColumnDef::float("stress_avg_7_day"),
    ColumnDef::float("recovery_score"),
    ColumnDef::text("training_readiness"),
];
