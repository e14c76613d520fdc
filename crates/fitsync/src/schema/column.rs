//! Column declarations: type and missing-value policy

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::record::{Value, DATE_FORMAT, TIMESTAMP_FORMAT};

/// Declared storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Bool,
    Date,
    Timestamp,
}

/// What a column holds when a record does not provide it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Empty cell
    Empty,
    /// `0` for numeric columns
    Zero,
    /// `false` for flags
    False,
    /// A fixed text default
    Literal(&'static str),
}

/// One column of a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub missing: MissingPolicy,
}

impl ColumnDef {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            missing: MissingPolicy::Empty,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub const fn int(name: &'static str) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub const fn float(name: &'static str) -> Self {
        Self::new(name, ColumnType::Float)
    }

    pub const fn flag(name: &'static str) -> Self {
        Self::new(name, ColumnType::Bool).or(MissingPolicy::False)
    }

    pub const fn date(name: &'static str) -> Self {
        Self::new(name, ColumnType::Date)
    }

    pub const fn timestamp(name: &'static str) -> Self {
        Self::new(name, ColumnType::Timestamp)
    }

    /// Override the missing-value policy
    pub const fn or(self, missing: MissingPolicy) -> Self {
        Self { missing, ..self }
    }

    pub const fn or_zero(self) -> Self {
        self.or(MissingPolicy::Zero)
    }

    /// Value written when the column is absent or empty
    pub fn fill(&self) -> Value {
        match (self.missing, self.ty) {
            (MissingPolicy::Empty, _) => Value::Missing,
            (MissingPolicy::Zero, ColumnType::Integer) => Value::Integer(0),
            (MissingPolicy::Zero, ColumnType::Float) => Value::Float(0.0),
            (MissingPolicy::Zero, _) => Value::Text("0".to_string()),
            (MissingPolicy::False, ColumnType::Bool) => Value::Bool(false),
            (MissingPolicy::False, _) => Value::Text("false".to_string()),
            (MissingPolicy::Literal(text), _) => Value::Text(text.to_string()),
        }
    }

    /// Coerce a value to the declared type.
    ///
    /// Missing (or blank text) becomes the fill value; anything that cannot
    /// be represented in the declared type is an error naming the column.
    pub fn coerce(&self, value: &Value) -> Result<Value, String> {
        if value.is_missing() || matches!(value, Value::Text(s) if s.trim().is_empty()) {
            return Ok(self.fill());
        }
        let coerced = match self.ty {
            ColumnType::Text => Some(match value {
                Value::Text(s) => Value::Text(s.clone()),
                other => Value::Text(other.render()),
            }),
            ColumnType::Integer => coerce_integer(value).map(Value::Integer),
            ColumnType::Float => coerce_float(value).map(Value::from),
            ColumnType::Bool => coerce_bool(value).map(Value::Bool),
            ColumnType::Date => value.as_date().map(Value::Date),
            ColumnType::Timestamp => coerce_timestamp(value).map(Value::Timestamp),
        };
        coerced.ok_or_else(|| {
            format!(
                "column {} expects {:?}, got {:?}",
                self.name,
                self.ty,
                value.render()
            )
        })
    }

    /// Parse a cell read back from a partition file
    pub fn parse_cell(&self, cell: &str) -> Result<Value, String> {
        self.coerce(&Value::Text(cell.to_string()))
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Text(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(_) | Value::Date(_) | Value::Timestamp(_) => None,
        other => other.as_f64().filter(|f| f.is_finite()),
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Integer(0) => Some(false),
        Value::Integer(1) => Some(true),
        Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Timestamp(t) => Some(*t),
        Value::Date(d) => d.and_hms_opt(0, 0, 0),
        Value::Text(s) => parse_timestamp(s.trim()),
        _ => None,
    }
}

/// Parse the timestamp shapes providers emit
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    for format in [
        TIMESTAMP_FORMAT,
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Some(t);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
