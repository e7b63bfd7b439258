//! SQL value types shared by every adapter.
//!
//! Values crossing the adapter boundary are restricted to a small scalar set
//! so that rows read from one engine can be written to any other. Engine
//! specific types (dates, decimals, booleans stored as integers) are folded
//! into this set by each driver.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical text form for timestamps read from any engine.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical text form for dates read from any engine.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single scalar column value.
///
/// Serializes to the matching JSON scalar (`null`, `true`, `42`, `1.5`, `"x"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Any integer column, widened to 64 bits.
    Int(i64),

    /// Any floating point or decimal column.
    Float(f64),

    /// Text, and the canonical text form of dates and timestamps.
    Text(String),
}

/// A row: column name to value.
pub type Row = BTreeMap<String, SqlValue>;

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Convert a JSON value into a column value.
    ///
    /// Nested arrays and objects are kept as their JSON text.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Int(i),
                None => SqlValue::Float(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        }
    }

    /// Integer view of the value, if it has one.
    ///
    /// Booleans map to 0/1, whole floats and numeric text are accepted.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i),
            SqlValue::Bool(b) => Some(i64::from(*b)),
            SqlValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Floating point view of the value, if it has one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Float(f) => Some(*f),
            SqlValue::Int(i) => Some(*i as f64),
            SqlValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            SqlValue::Text(s) => s.trim().parse().ok(),
            SqlValue::Null => None,
        }
    }

    /// Boolean view of the value: integers are true when non-zero.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(b) => Some(*b),
            SqlValue::Int(i) => Some(*i != 0),
            SqlValue::Float(f) => Some(*f != 0.0),
            SqlValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "1" | "t" | "true" | "yes" | "on" => Some(true),
                "0" | "f" | "false" | "no" | "off" => Some(false),
                _ => None,
            },
            SqlValue::Null => None,
        }
    }

    /// Text view of the value; NULL yields `None`.
    #[must_use]
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            SqlValue::Text(s) => Some(Cow::Borrowed(s)),
            SqlValue::Int(i) => Some(Cow::Owned(i.to_string())),
            SqlValue::Float(f) => Some(Cow::Owned(f.to_string())),
            SqlValue::Bool(b) => Some(Cow::Owned(b.to_string())),
            SqlValue::Null => None,
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(i64::from(v))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}
