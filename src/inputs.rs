//! Column Input Type Resolution
//!
//! Decides which input control edits a column. The decision is a pure lookup:
//!
//! ```text
//! overrides[column.name]          (per-table settings, wins outright)
//!     ↓ absent
//! autodetect(column.oid)          (static OID table)
//!     ↓ unknown OID
//! textarea                        (fallback, never drops a column)
//! ```
//!
//! `select` and `hidden` are never autodetected: `select` needs an options
//! payload the schema cannot supply, and `hidden` is a display preference.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pg_types::{oid, Oid, PgColumn};

/// Kind of input control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Checkbox,
    Input,
    Textarea,
    JsonTextarea,
    DatePicker,
    TimePicker,
    DateTimePicker,
    /// Fixed option list, override only
    Select,
    /// Excluded from forms and table views, override only
    Hidden,
}

impl InputKind {
    /// Kinds the OID table can produce
    pub const AUTO: [InputKind; 7] = [
        InputKind::Checkbox,
        InputKind::Input,
        InputKind::Textarea,
        InputKind::JsonTextarea,
        InputKind::DatePicker,
        InputKind::TimePicker,
        InputKind::DateTimePicker,
    ];

    /// Kinds only reachable through an override
    pub const MANUAL: [InputKind; 2] = [InputKind::Select, InputKind::Hidden];

    pub fn as_str(self) -> &'static str {
        match self {
            InputKind::Checkbox => "checkbox",
            InputKind::Input => "input",
            InputKind::Textarea => "textarea",
            InputKind::JsonTextarea => "jsontextarea",
            InputKind::DatePicker => "datepicker",
            InputKind::TimePicker => "timepicker",
            InputKind::DateTimePicker => "datetimepicker",
            InputKind::Select => "select",
            InputKind::Hidden => "hidden",
        }
    }

    pub fn is_manual(self) -> bool {
        Self::MANUAL.contains(&self)
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::AUTO
            .iter()
            .chain(Self::MANUAL.iter())
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown input type '{s}'"))
    }
}

/// Options for a `select` input
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectPayload {
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub multi: bool,
}

/// Resolved input control for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputTypeLookup {
    #[serde(rename = "type")]
    pub kind: InputKind,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<SelectPayload>,
}

impl InputTypeLookup {
    pub const fn new(kind: InputKind) -> Self {
        InputTypeLookup {
            kind,
            is_array: false,
            payload: None,
        }
    }

    pub const fn array(kind: InputKind) -> Self {
        InputTypeLookup {
            kind,
            is_array: true,
            payload: None,
        }
    }

    pub fn select(options: Vec<String>, multi: bool) -> Self {
        InputTypeLookup {
            kind: InputKind::Select,
            is_array: false,
            payload: Some(SelectPayload { options, multi }),
        }
    }

    pub fn hidden() -> Self {
        Self::new(InputKind::Hidden)
    }

    pub fn is_hidden(&self) -> bool {
        self.kind == InputKind::Hidden
    }
}

/// Column name -> overriding input type (from table settings)
pub type OverrideMap = HashMap<String, InputTypeLookup>;

/// Control used for columns whose type has no entry in the OID table
pub const FALLBACK_INPUT: InputTypeLookup = InputTypeLookup::new(InputKind::Textarea);

/// Look up the control for a type OID. `None` for unmapped types.
pub fn autodetect(type_oid: Oid) -> Option<InputTypeLookup> {
    use InputKind::{Checkbox, DatePicker, DateTimePicker, Input, JsonTextarea, Textarea, TimePicker};

    let lookup = match type_oid {
        oid::BOOL => InputTypeLookup::new(Checkbox),

        oid::INT2 | oid::INT4 | oid::INT8 | oid::FLOAT4 | oid::FLOAT8 | oid::NUMERIC => {
            InputTypeLookup::new(Input)
        }
        oid::UUID | oid::INET => InputTypeLookup::new(Input),

        oid::TEXT | oid::VARCHAR | oid::BPCHAR | oid::NAME => InputTypeLookup::new(Textarea),
        oid::INTERVAL => InputTypeLookup::new(Textarea),

        oid::DATE => InputTypeLookup::new(DatePicker),
        oid::TIME => InputTypeLookup::new(TimePicker),
        oid::TIMESTAMP | oid::TIMESTAMPTZ | oid::TIMETZ => InputTypeLookup::new(DateTimePicker),

        oid::JSON | oid::JSONB | oid::JSONPATH => InputTypeLookup::new(JsonTextarea),

        // Arrays reuse the element's control
        oid::BOOL_ARRAY => InputTypeLookup::array(Checkbox),
        oid::INT2_ARRAY
        | oid::INT4_ARRAY
        | oid::INT8_ARRAY
        | oid::FLOAT4_ARRAY
        | oid::FLOAT8_ARRAY
        | oid::NUMERIC_ARRAY
        | oid::UUID_ARRAY
        | oid::INET_ARRAY => InputTypeLookup::array(Input),
        oid::TEXT_ARRAY | oid::VARCHAR_ARRAY | oid::BPCHAR_ARRAY | oid::NAME_ARRAY => {
            InputTypeLookup::array(Textarea)
        }
        oid::DATE_ARRAY => InputTypeLookup::array(DatePicker),
        oid::TIME_ARRAY => InputTypeLookup::array(TimePicker),
        oid::TIMESTAMP_ARRAY | oid::TIMESTAMPTZ_ARRAY | oid::TIMETZ_ARRAY => {
            InputTypeLookup::array(DateTimePicker)
        }
        // JSON arrays are edited element-wise as plain text
        oid::JSON_ARRAY | oid::JSONB_ARRAY => InputTypeLookup::array(Textarea),

        _ => return None,
    };

    Some(lookup)
}

/// Resolve the input control for `column`.
///
/// An override for the column name replaces the autodetected lookup
/// entirely; fields are not merged.
pub fn resolve_input_type(column: &PgColumn, overrides: Option<&OverrideMap>) -> InputTypeLookup {
    if let Some(overridden) = overrides.and_then(|map| map.get(&column.name)) {
        return overridden.clone();
    }

    autodetect(column.oid).unwrap_or(FALLBACK_INPUT)
}
