//! Row cell values
//!
//! Rows come back from the backend as JSON objects whose fields can be any
//! JSON value (PostgreSQL arrays become JSON arrays, `json`/`jsonb` become
//! nested objects). [`CellValue`] makes that variant explicit.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One field of a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<CellValue>),
    Object(serde_json::Map<String, serde_json::Value>),
}

/// A row keyed by column name, in the order the backend sent the columns
pub type Row = IndexMap<String, CellValue>;

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Truthiness as the panel applies it: null, false, 0 and "" are falsy,
    /// everything else (including empty arrays and objects) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Null => false,
            CellValue::Bool(b) => *b,
            CellValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            CellValue::String(s) => !s.is_empty(),
            CellValue::Array(_) | CellValue::Object(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CellValue]> {
        match self {
            CellValue::Array(items) => Some(items),
            _ => None,
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, CellValue::Array(_) | CellValue::Object(_))
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Bool(b) => serde_json::Value::Bool(*b),
            CellValue::Number(n) => serde_json::Value::Number(n.clone()),
            CellValue::String(s) => serde_json::Value::String(s.clone()),
            CellValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(CellValue::to_json).collect())
            }
            CellValue::Object(map) => serde_json::Value::Object(map.clone()),
        }
    }

    fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_json()).unwrap_or_else(|_| "[Object]".to_string())
    }
}

/// Display form used in tables and text labels.
///
/// - `null` renders as `NULL`
/// - an empty array renders as `[]`
/// - arrays of primitives are joined with `", "`
/// - objects and arrays of objects are pretty-printed JSON
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "NULL"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Array(items) if items.is_empty() => write!(f, "[]"),
            CellValue::Array(items) if items[0].is_compound() => {
                write!(f, "{}", self.to_pretty_json())
            }
            CellValue::Array(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(", "))
            }
            CellValue::Object(_) => write!(f, "{}", self.to_pretty_json()),
        }
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Bool(b) => CellValue::Bool(b),
            serde_json::Value::Number(n) => CellValue::Number(n),
            serde_json::Value::String(s) => CellValue::String(s),
            serde_json::Value::Array(items) => {
                CellValue::Array(items.into_iter().map(CellValue::from).collect())
            }
            serde_json::Value::Object(map) => CellValue::Object(map),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n.into())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or(CellValue::Null, CellValue::Number)
    }
}
