//! Scalar values and flat records
//!
//! A [`Record`] is a loose column → [`Value`] mapping produced by the
//! normalizer. It only becomes rectangular once projected onto a
//! [`SchemaDescriptor`](super::SchemaDescriptor).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

static MISSING: Value = Value::Missing;

/// A single scalar cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Missing,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Render the value the way it is written to a partition file
    pub fn render(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::Timestamp(t) => t.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Timestamp(t) => Some(t.date()),
            Value::Text(s) => s
                .get(..10)
                .and_then(|head| NaiveDate::parse_from_str(head, DATE_FORMAT).ok()),
            _ => None,
        }
    }

    /// Finite numeric value, also for text that parses as a number
    fn numeric(&self) -> Option<f64> {
        self.as_f64().filter(|f| f.is_finite())
    }

    /// Sort class: missing, numbers (including numeric text), dates,
    /// timestamps, flags, then other text
    fn sort_class(&self) -> u8 {
        match self {
            Value::Missing => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::Text(_) if self.numeric().is_some() => 1,
            Value::Date(_) => 2,
            Value::Timestamp(_) => 3,
            Value::Bool(_) => 4,
            Value::Text(_) => 5,
        }
    }

    /// Total order used for sorting partitions.
    ///
    /// Values compare by sort class first, so numeric text always sorts
    /// before non-numeric text; within a class numbers compare numerically,
    /// dates and timestamps chronologically, and the rendered text breaks
    /// remaining ties.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        self.sort_class()
            .cmp(&other.sort_class())
            .then_with(|| match (self, other) {
                (Value::Date(a), Value::Date(b)) => a.cmp(b),
                (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
                (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
                _ => match (self.numeric(), other.numeric()) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    _ => Ordering::Equal,
                },
            })
            .then_with(|| self.render().cmp(&other.render()))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        if f.is_finite() {
            Value::Float(f)
        } else {
            Value::Missing
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(t: NaiveDateTime) -> Self {
        Value::Timestamp(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Missing)
    }
}

/// Convert a provider JSON scalar into a cell value
impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Missing,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().into(),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }
}

/// One row of named values, not yet bound to a schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing any previous value
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Builder-style [`Record::set`]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column only when the value is present
    pub fn set_present(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if !value.is_missing() {
            self.fields.insert(column.into(), value);
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Value of a column, [`Value::Missing`] when absent
    pub fn value(&self, column: &str) -> &Value {
        self.fields.get(column).unwrap_or(&MISSING)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}
