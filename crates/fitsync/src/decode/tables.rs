//! Decode tables for the Connect IQ apps we know about

use super::{DecodeTable, FieldMapping, RoundRange, Transform};

/// Wim Hof Method breathing app
pub static WIM_HOF: DecodeTable = DecodeTable {
    fields: &[
        FieldMapping::new(0, "whm_rounds_total", Transform::Integer),
        FieldMapping::new(1, "whm_total_breaths", Transform::Integer),
        FieldMapping::new(2, "whm_max_breath_hold", Transform::Text),
        FieldMapping::new(3, "whm_max_breath_hold_stage2", Transform::Text),
    ],
    rounds: Some(RoundRange {
        first: 11,
        last: 16,
        column: "whm_round_details",
    }),
};

/// Surf Tracker app
pub static SURF_TRACKER: DecodeTable = DecodeTable {
    fields: &[
        FieldMapping::new(0, "total_waves", Transform::Integer),
        FieldMapping::new(1, "longest_wave_seconds", Transform::Float),
        FieldMapping::new(2, "max_speed_kmh", Transform::Float),
        FieldMapping::new(3, "total_surf_time_seconds", Transform::Float),
    ],
    rounds: None,
};
